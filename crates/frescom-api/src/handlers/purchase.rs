//! Purchase order handlers
//!
//! Both routes are tenant-scoped: the tenant comes from the caller's token,
//! never from the request body.

use crate::audit::{audit_log, AuditEvent};
use crate::error::{ApiError, AppError};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use frescom_core::{CreatedPurchaseOrder, Identity, NewPurchaseOrder, PurchaseOrderSummary};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

/// Listing filter
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Prefix of the doc number, supplier name or supplier code
    #[serde(default)]
    pub search: String,
}

/// Create a purchase order with its item lines
#[utoipa::path(
    post,
    path = "/purchase",
    tag = "purchase",
    request_body = NewPurchaseOrder,
    responses(
        (status = 201, description = "Purchase order created", body = CreatedPurchaseOrder),
        (status = 400, description = "Invalid purchase order", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "No program assigned", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_purchase_order(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(order): Json<NewPurchaseOrder>,
) -> Result<impl IntoResponse, AppError> {
    let tenant_code = identity.require_tenant()?;
    order.check()?;

    let created = state
        .purchase_orders
        .create(tenant_code, &identity.login, &order)
        .await?;

    audit_log(&AuditEvent::PurchaseOrderCreated {
        login: identity.login.clone(),
        tenant_code: tenant_code.to_string(),
        sl_no: created.sl_no,
        po_no: created.po_no.clone(),
    });

    Ok((StatusCode::CREATED, Json(created)))
}

/// List the caller's purchase orders, oldest first
#[utoipa::path(
    get,
    path = "/purchase",
    tag = "purchase",
    params(ListQuery),
    responses(
        (status = 200, description = "Purchase orders", body = Vec<PurchaseOrderSummary>),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "No program assigned", body = ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_purchase_orders(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PurchaseOrderSummary>>, AppError> {
    let tenant_code = identity.require_tenant()?;
    let orders = state.purchase_orders.list(tenant_code, &query.search).await?;

    Ok(Json(orders))
}
