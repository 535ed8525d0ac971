//! API route definitions

use crate::auth::middleware::auth_middleware;
use crate::handlers::{auth, health, purchase};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create API routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/login", post(auth::login_handler));

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/purchase",
            get(purchase::list_purchase_orders).post(purchase::create_purchase_order),
        )
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
