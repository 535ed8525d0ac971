//! Purchase order persistence
//!
//! Creation runs in one transaction: a per-tenant advisory lock serializes
//! `doc_no` allocation, the header and every line take their `sl_no` from
//! the shared `seq` sequence, and nothing is visible until commit.

use async_trait::async_trait;
use chrono::NaiveDate;
use frescom_core::purchase_order::po_number;
use frescom_core::{
    CreatedPurchaseOrder, FrescomError, NewPurchaseOrder, PurchaseOrderSummary, Result,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

/// Storage for tenant-scoped purchase orders
#[async_trait]
pub trait PurchaseOrderStore: Send + Sync {
    /// Insert a header and its lines, allocating `sl_no`, `doc_no` and `po_no`
    async fn create(
        &self,
        tenant_code: &str,
        login: &str,
        order: &NewPurchaseOrder,
    ) -> Result<CreatedPurchaseOrder>;

    /// Orders of a tenant whose doc number, supplier name or supplier code
    /// starts with `search` (case-insensitive), oldest first
    async fn list(&self, tenant_code: &str, search: &str) -> Result<Vec<PurchaseOrderSummary>>;
}

fn db_error(context: &str) -> impl Fn(sqlx::Error) -> FrescomError + '_ {
    move |e| FrescomError::DatabaseError(format!("{context}: {e}"))
}

/// Escape LIKE metacharacters so user input only ever matches as a prefix
fn like_prefix(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 1);
    for c in search.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    sl_no: i64,
    doc_no: i64,
    doc_date: NaiveDate,
    sup_code: Option<String>,
    sup_name: Option<String>,
}

impl From<SummaryRow> for PurchaseOrderSummary {
    fn from(row: SummaryRow) -> Self {
        PurchaseOrderSummary {
            sl_no: row.sl_no,
            doc_no: row.doc_no,
            doc_date: row.doc_date,
            sup_code: row.sup_code,
            sup_name: row.sup_name,
        }
    }
}

/// PostgreSQL purchase order store over the `po` and `po2` tables
#[derive(Clone)]
pub struct PgPurchaseOrderStore {
    pool: PgPool,
}

impl PgPurchaseOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn next_serial(tx: &mut Transaction<'_, Postgres>) -> Result<i64> {
        let (sl_no,): (i64,) = sqlx::query_as("SELECT nextval('seq')")
            .fetch_one(&mut **tx)
            .await
            .map_err(db_error("Failed to allocate serial number"))?;
        Ok(sl_no)
    }
}

#[async_trait]
impl PurchaseOrderStore for PgPurchaseOrderStore {
    async fn create(
        &self,
        tenant_code: &str,
        login: &str,
        order: &NewPurchaseOrder,
    ) -> Result<CreatedPurchaseOrder> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(tenant_code)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to lock tenant"))?;

        let (doc_no,): (i64,) = sqlx::query_as(
            "SELECT (COALESCE(MAX(doc_no), 0) + 1)::bigint FROM po WHERE co_code = $1",
        )
        .bind(tenant_code)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to compute document number"))?;

        let po = &order.header;
        let po_no = po_number(&po.doc_pref, doc_no);
        let sl_no = Self::next_serial(&mut tx).await?;

        sqlx::query(
            r#"
            INSERT INTO po (
                sl_no, doc_no, po_no, co_code, login,
                type_sl, doc_date, quo_date, quo_no, party_sl, shipto_sl,
                pt_sl, frt_sl, pricetype_sl, ins_sl, desp_mode_sl, transporter_sl,
                pack_type_sl, pl_sl, pd_sl, warr_sl, inar_sl, nar1, cur_sl,
                exc_rate, open_po, tc_yn, pr_type
            )
            VALUES (
                $1, $2, $3, $4, $5,
                $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21, $22, $23, $24,
                $25, $26, $27, $28
            )
            "#,
        )
        .bind(sl_no)
        .bind(doc_no)
        .bind(&po_no)
        .bind(tenant_code)
        .bind(login)
        .bind(&po.type_sl)
        .bind(po.doc_date)
        .bind(po.quo_date)
        .bind(&po.quo_no)
        .bind(&po.party_sl)
        .bind(&po.shipto_sl)
        .bind(&po.pt_sl)
        .bind(&po.frt_sl)
        .bind(&po.pricetype_sl)
        .bind(&po.ins_sl)
        .bind(&po.desp_mode_sl)
        .bind(&po.transporter_sl)
        .bind(&po.pack_type_sl)
        .bind(&po.pl_sl)
        .bind(&po.pd_sl)
        .bind(&po.warr_sl)
        .bind(&po.inar_sl)
        .bind(&po.nar1)
        .bind(&po.cur_sl)
        .bind(po.exc_rate)
        .bind(po.open_po)
        .bind(&po.tc_yn)
        .bind(po.pr_type)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to insert purchase order"))?;

        for line in &order.lines {
            let line_sl_no = Self::next_serial(&mut tx).await?;

            sqlx::query(
                r#"
                INSERT INTO po2 (
                    sl_no, po_sl, co_code, login,
                    doc_date, item_sl, unit_sl, item_code, qty, make_sl, rate,
                    per_unit, disc_pc, gst_pc, sch_date, gross, nar, name
                )
                VALUES (
                    $1, $2, $3, $4,
                    $5, $6, $7, $8, $9, $10, $11,
                    $12, $13, $14, $15, $16, $17, $18
                )
                "#,
            )
            .bind(line_sl_no)
            .bind(sl_no)
            .bind(tenant_code)
            .bind(login)
            .bind(line.doc_date)
            .bind(&line.item_sl)
            .bind(&line.unit_sl)
            .bind(&line.item_code)
            .bind(line.qty)
            .bind(&line.make_sl)
            .bind(line.rate)
            .bind(line.per_unit)
            .bind(line.disc_pc)
            .bind(line.gst_pc)
            .bind(line.sch_date)
            .bind(line.gross)
            .bind(&line.nar)
            .bind(&line.name)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to insert purchase order line"))?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit purchase order"))?;

        tracing::debug!(
            tenant_code,
            sl_no,
            doc_no,
            lines = order.lines.len(),
            "purchase order stored"
        );

        Ok(CreatedPurchaseOrder {
            sl_no,
            doc_no,
            po_no,
        })
    }

    async fn list(&self, tenant_code: &str, search: &str) -> Result<Vec<PurchaseOrderSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT po.sl_no::bigint AS sl_no, po.doc_no::bigint AS doc_no, po.doc_date,
                   s.code AS sup_code, s.name AS sup_name
            FROM po
            LEFT JOIN supp_view s ON po.party_sl = s.sl_no
            WHERE po.co_code = $1
              AND (po.doc_no::text ILIKE $2 OR s.name ILIKE $2 OR s.code ILIKE $2)
            ORDER BY po.doc_date
            "#,
        )
        .bind(tenant_code)
        .bind(like_prefix(search))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list purchase orders"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod memory {
    //! In-memory purchase order store for tests

    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Debug, Clone)]
    struct StoredOrder {
        sl_no: i64,
        doc_no: i64,
        login: String,
        order: NewPurchaseOrder,
    }

    #[derive(Default)]
    struct Inner {
        next_serial: i64,
        orders: HashMap<String, Vec<StoredOrder>>,
        suppliers: HashMap<String, (String, String)>,
    }

    /// Purchase order store backed by a mutex-guarded map, keyed by tenant
    #[derive(Default)]
    pub struct InMemoryPurchaseOrderStore {
        inner: Mutex<Inner>,
    }

    impl InMemoryPurchaseOrderStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a supplier so listings can resolve `party_sl`
        pub async fn insert_supplier(&self, sl_no: &str, code: &str, name: &str) {
            self.inner
                .lock()
                .await
                .suppliers
                .insert(sl_no.to_string(), (code.to_string(), name.to_string()));
        }

        /// Number of stored lines for an order
        pub async fn line_count(&self, tenant_code: &str, sl_no: i64) -> usize {
            self.inner
                .lock()
                .await
                .orders
                .get(tenant_code)
                .and_then(|orders| orders.iter().find(|o| o.sl_no == sl_no))
                .map_or(0, |o| o.order.lines.len())
        }

        /// Login recorded as the creator of an order
        pub async fn created_by(&self, tenant_code: &str, sl_no: i64) -> Option<String> {
            self.inner
                .lock()
                .await
                .orders
                .get(tenant_code)
                .and_then(|orders| orders.iter().find(|o| o.sl_no == sl_no))
                .map(|o| o.login.clone())
        }
    }

    fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
        value.to_lowercase().starts_with(&prefix.to_lowercase())
    }

    #[async_trait]
    impl PurchaseOrderStore for InMemoryPurchaseOrderStore {
        async fn create(
            &self,
            tenant_code: &str,
            login: &str,
            order: &NewPurchaseOrder,
        ) -> Result<CreatedPurchaseOrder> {
            let mut inner = self.inner.lock().await;

            let doc_no = inner
                .orders
                .get(tenant_code)
                .and_then(|orders| orders.iter().map(|o| o.doc_no).max())
                .unwrap_or(0)
                + 1;

            // Header first, then one serial per line
            inner.next_serial += 1;
            let sl_no = inner.next_serial;
            inner.next_serial += order.lines.len() as i64;

            inner
                .orders
                .entry(tenant_code.to_string())
                .or_default()
                .push(StoredOrder {
                    sl_no,
                    doc_no,
                    login: login.to_string(),
                    order: order.clone(),
                });

            Ok(CreatedPurchaseOrder {
                sl_no,
                doc_no,
                po_no: po_number(&order.header.doc_pref, doc_no),
            })
        }

        async fn list(
            &self,
            tenant_code: &str,
            search: &str,
        ) -> Result<Vec<PurchaseOrderSummary>> {
            let inner = self.inner.lock().await;
            let search = search.trim();

            let mut rows: Vec<PurchaseOrderSummary> = inner
                .orders
                .get(tenant_code)
                .into_iter()
                .flatten()
                .map(|stored| {
                    let supplier = inner.suppliers.get(&stored.order.header.party_sl);
                    PurchaseOrderSummary {
                        sl_no: stored.sl_no,
                        doc_no: stored.doc_no,
                        doc_date: stored.order.header.doc_date,
                        sup_code: supplier.map(|(code, _)| code.clone()),
                        sup_name: supplier.map(|(_, name)| name.clone()),
                    }
                })
                .filter(|row| {
                    starts_with_ignore_case(&row.doc_no.to_string(), search)
                        || row
                            .sup_name
                            .as_deref()
                            .is_some_and(|name| starts_with_ignore_case(name, search))
                        || row
                            .sup_code
                            .as_deref()
                            .is_some_and(|code| starts_with_ignore_case(code, search))
                })
                .collect();

            rows.sort_by_key(|row| row.doc_date);
            Ok(rows)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::InMemoryPurchaseOrderStore;
    use super::*;
    use serde_json::json;

    fn order(doc_date: &str, party_sl: &str, lines: usize) -> NewPurchaseOrder {
        let line = json!({
            "doc_date": doc_date,
            "item_sl": "I-1",
            "unit_sl": "NOS",
            "qty": 5,
            "make_sl": "M-1",
            "rate": 12.5,
            "sch_date": doc_date,
            "gross": 62.5,
            "name": "Bearing"
        });
        serde_json::from_value(json!({
            "po": {
                "type_sl": "240",
                "doc_date": doc_date,
                "doc_pref": "PO",
                "party_sl": party_sl,
                "shipto_sl": "SH-1"
            },
            "po2": vec![line; lines]
        }))
        .unwrap()
    }

    #[test]
    fn test_like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("ac"), "ac%");
        assert_eq!(like_prefix(""), "%");
        assert_eq!(like_prefix("50%_"), "50\\%\\_%");
    }

    #[tokio::test]
    async fn test_doc_numbers_are_per_tenant() {
        let store = InMemoryPurchaseOrderStore::new();

        let first = store.create("07", "bob", &order("2024-05-01", "S-1", 1)).await.unwrap();
        let second = store.create("07", "bob", &order("2024-05-02", "S-1", 2)).await.unwrap();
        let other = store.create("09", "dave", &order("2024-05-02", "S-1", 1)).await.unwrap();

        assert_eq!(first.doc_no, 1);
        assert_eq!(first.po_no, "PO/1");
        assert_eq!(second.doc_no, 2);
        assert_eq!(second.po_no, "PO/2");
        assert_eq!(other.doc_no, 1);
        assert_ne!(first.sl_no, second.sl_no);
        assert_eq!(store.line_count("07", second.sl_no).await, 2);
        assert_eq!(store.created_by("07", first.sl_no).await.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix_and_sorts_by_date() {
        let store = InMemoryPurchaseOrderStore::new();
        store.insert_supplier("S-1", "ACME", "Acme Tools").await;
        store.insert_supplier("S-2", "BOLT", "Bolt Works").await;

        store.create("07", "bob", &order("2024-05-03", "S-1", 1)).await.unwrap();
        store.create("07", "bob", &order("2024-05-01", "S-2", 1)).await.unwrap();
        store.create("09", "dave", &order("2024-05-01", "S-1", 1)).await.unwrap();

        let all = store.list("07", "").await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].doc_date <= all[1].doc_date);
        assert_eq!(all[0].sup_code.as_deref(), Some("BOLT"));

        let acme = store.list("07", "acm").await.unwrap();
        assert_eq!(acme.len(), 1);
        assert_eq!(acme[0].sup_name.as_deref(), Some("Acme Tools"));

        let by_name = store.list("07", "bolt w").await.unwrap();
        assert_eq!(by_name.len(), 1);

        assert!(store.list("07", "zzz").await.unwrap().is_empty());
        assert!(store.list("11", "").await.unwrap().is_empty());
    }
}
