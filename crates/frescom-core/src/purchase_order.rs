//! Purchase order models
//!
//! A purchase order is a header row (`po`) with one or more item lines (`po2`),
//! scoped to the tenant of the authenticated user.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{FrescomError, Result};

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn default_exchange_rate() -> f64 {
    1.0
}

fn default_test_certificate() -> String {
    "N".to_string()
}

fn default_price_type() -> i32 {
    16
}

fn default_per_unit() -> i64 {
    1
}

fn validate_yes_no(value: &str) -> std::result::Result<(), ValidationError> {
    match value {
        "Y" | "N" => Ok(()),
        _ => Err(ValidationError::new("yes_no")),
    }
}

fn validate_schedule(line: &PurchaseOrderLine) -> std::result::Result<(), ValidationError> {
    if line.sch_date < line.doc_date {
        let mut err = ValidationError::new("schedule_before_document");
        err.message = Some("sch_date must be greater than or equal to doc_date".into());
        return Err(err);
    }
    Ok(())
}

/// Create request: header plus item lines
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewPurchaseOrder {
    #[serde(rename = "po")]
    #[validate(nested)]
    pub header: PurchaseOrderHeader,

    #[serde(rename = "po2")]
    #[validate(length(min = 1, message = "at least one item line is required"), nested)]
    pub lines: Vec<PurchaseOrderLine>,
}

impl NewPurchaseOrder {
    /// Run field validation, flattening failures into a single message
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| FrescomError::ValidationError(e.to_string()))
    }
}

/// Purchase order header (`po` table)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PurchaseOrderHeader {
    /// Purchase order type code
    #[validate(length(min = 1, max = 30))]
    pub type_sl: String,

    #[serde(default = "today")]
    pub doc_date: NaiveDate,

    pub quo_date: Option<NaiveDate>,

    #[validate(length(max = 50))]
    pub quo_no: Option<String>,

    /// Document prefix used to build `po_no`
    #[validate(length(min = 1, max = 50))]
    pub doc_pref: String,

    /// Supplier
    #[validate(length(min = 1, max = 50))]
    pub party_sl: String,

    /// Ship-to address
    #[validate(length(min = 1, max = 30))]
    pub shipto_sl: String,

    #[validate(length(max = 30))]
    pub pt_sl: Option<String>,

    #[validate(length(max = 30))]
    pub frt_sl: Option<String>,

    #[validate(length(max = 30))]
    pub pricetype_sl: Option<String>,

    #[validate(length(max = 30))]
    pub ins_sl: Option<String>,

    #[validate(length(max = 30))]
    pub desp_mode_sl: Option<String>,

    #[validate(length(max = 30))]
    pub transporter_sl: Option<String>,

    #[validate(length(max = 50))]
    pub pack_type_sl: Option<String>,

    #[validate(length(max = 40))]
    pub pl_sl: Option<String>,

    #[validate(length(max = 40))]
    pub pd_sl: Option<String>,

    #[validate(length(max = 30))]
    pub warr_sl: Option<String>,

    #[validate(length(max = 30))]
    pub inar_sl: Option<String>,

    /// Special remarks
    #[validate(length(max = 2000))]
    pub nar1: Option<String>,

    #[validate(length(max = 30))]
    pub cur_sl: Option<String>,

    #[serde(default = "default_exchange_rate")]
    #[validate(range(min = 1.0, max = 999999999.0))]
    pub exc_rate: f64,

    #[serde(default)]
    #[validate(range(min = 0, max = 1))]
    pub open_po: i32,

    /// Test certificate required ("Y" or "N")
    #[serde(default = "default_test_certificate")]
    #[validate(custom(function = "validate_yes_no"))]
    pub tc_yn: String,

    #[serde(default = "default_price_type")]
    pub pr_type: i32,
}

/// Purchase order item line (`po2` table)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_schedule", skip_on_field_errors = false))]
pub struct PurchaseOrderLine {
    pub doc_date: NaiveDate,

    #[validate(length(min = 1, max = 50))]
    pub item_sl: String,

    #[validate(length(min = 1, max = 30))]
    pub unit_sl: String,

    #[validate(length(max = 50))]
    pub item_code: Option<String>,

    #[validate(range(min = 1, max = 99999999))]
    pub qty: i64,

    #[validate(length(min = 1, max = 75))]
    pub make_sl: String,

    #[validate(range(exclusive_min = 0.0, max = 9999999999.0))]
    pub rate: f64,

    #[serde(default = "default_per_unit")]
    #[validate(range(max = 9999999))]
    pub per_unit: i64,

    #[serde(default)]
    #[validate(range(min = 0.0, max = 999.999))]
    pub disc_pc: f64,

    #[serde(default)]
    #[validate(range(min = 0.0, max = 999.999))]
    pub gst_pc: f64,

    /// Scheduled delivery date, not before `doc_date`
    #[serde(default = "today")]
    pub sch_date: NaiveDate,

    #[validate(range(min = 0.0, max = 9999999999.0))]
    pub gross: f64,

    #[validate(length(max = 100))]
    pub nar: Option<String>,

    /// Item description
    #[validate(length(min = 1, max = 500))]
    pub name: String,
}

/// Numbers allocated to a newly created purchase order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreatedPurchaseOrder {
    pub sl_no: i64,
    pub doc_no: i64,
    pub po_no: String,
}

/// Row of the purchase order listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderSummary {
    pub sl_no: i64,
    pub doc_no: i64,
    pub doc_date: NaiveDate,
    pub sup_code: Option<String>,
    pub sup_name: Option<String>,
}

/// Printable purchase order number, e.g. `PO/24`
pub fn po_number(doc_pref: &str, doc_no: i64) -> String {
    format!("{}/{doc_no}", doc_pref.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "po": {
                "type_sl": "240",
                "doc_date": "2024-05-01",
                "doc_pref": "PO",
                "party_sl": "S-1",
                "shipto_sl": "SH-1"
            },
            "po2": [{
                "doc_date": "2024-05-01",
                "item_sl": "I-1",
                "unit_sl": "U-1",
                "qty": 10,
                "make_sl": "M-1",
                "rate": 12.5,
                "sch_date": "2024-05-10",
                "gross": 125.0,
                "name": "Widget"
            }]
        })
    }

    #[test]
    fn test_defaults_applied() {
        let order: NewPurchaseOrder = serde_json::from_value(sample()).unwrap();
        assert_eq!(order.header.exc_rate, 1.0);
        assert_eq!(order.header.tc_yn, "N");
        assert_eq!(order.header.pr_type, 16);
        assert_eq!(order.lines[0].per_unit, 1);
        assert!(order.check().is_ok());
    }

    #[test]
    fn test_schedule_before_document_rejected() {
        let mut value = sample();
        value["po2"][0]["sch_date"] = json!("2024-04-01");
        let order: NewPurchaseOrder = serde_json::from_value(value).unwrap();

        let err = order.check().unwrap_err();
        assert!(matches!(err, FrescomError::ValidationError(_)));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut value = sample();
        value["po2"][0]["qty"] = json!(0);
        let order: NewPurchaseOrder = serde_json::from_value(value).unwrap();
        assert!(order.check().is_err());
    }

    #[test]
    fn test_zero_rate_rejected() {
        let mut value = sample();
        value["po2"][0]["rate"] = json!(0.0);
        let order: NewPurchaseOrder = serde_json::from_value(value).unwrap();
        assert!(order.check().is_err());
    }

    #[test]
    fn test_empty_lines_rejected() {
        let mut value = sample();
        value["po2"] = json!([]);
        let order: NewPurchaseOrder = serde_json::from_value(value).unwrap();
        assert!(order.check().is_err());
    }

    #[test]
    fn test_test_certificate_flag() {
        let mut value = sample();
        value["po"]["tc_yn"] = json!("maybe");
        let order: NewPurchaseOrder = serde_json::from_value(value).unwrap();
        assert!(order.check().is_err());
    }

    #[test]
    fn test_po_number() {
        assert_eq!(po_number("PO ", 24), "PO/24");
    }
}
