//! Frescom API - REST server
//!
//! Provides the login/provisioning flow and tenant-scoped purchase orders.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod purchase;
pub mod routes;
pub mod state;

use axum::{http::HeaderValue, Router};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Frescom API",
        description = "Login/provisioning flow and purchase orders"
    ),
    paths(
        handlers::health::health_check,
        handlers::auth::login_handler,
        handlers::auth::me_handler,
        handlers::purchase::create_purchase_order,
        handlers::purchase::list_purchase_orders,
    ),
    components(schemas(
        error::ApiError,
        handlers::health::HealthResponse,
        handlers::auth::LoginRequest,
        handlers::auth::TokenResponse,
        handlers::auth::NewUserResponse,
        frescom_core::Identity,
        frescom_core::NewPurchaseOrder,
        frescom_core::PurchaseOrderHeader,
        frescom_core::PurchaseOrderLine,
        frescom_core::CreatedPurchaseOrder,
        frescom_core::PurchaseOrderSummary,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Login and identity"),
        (name = "purchase", description = "Purchase orders"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    routes::api_routes(state.clone())
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    //! Router wired to in-memory stores, for integration tests

    use super::*;
    use crate::auth::{Argon2Hasher, InMemoryCredentialStore};
    use crate::purchase::InMemoryPurchaseOrderStore;
    use frescom_core::config::AppConfig;

    /// Handles to the stores behind a testing router
    pub struct TestContext {
        pub state: Arc<AppState>,
        pub credentials: Arc<InMemoryCredentialStore>,
        pub hasher: Arc<Argon2Hasher>,
        pub purchase_orders: Arc<InMemoryPurchaseOrderStore>,
    }

    /// Build a router over empty in-memory stores with the Argon2 hasher
    pub fn create_test_context() -> TestContext {
        let config = AppConfig::default();
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let purchase_orders = Arc::new(InMemoryPurchaseOrderStore::new());
        // Low cost parameters keep tests fast
        let hasher = Arc::new(
            Argon2Hasher::new(config.password.salt.as_bytes(), 8, 1, 1)
                .unwrap_or_else(|e| panic!("invalid test hasher parameters: {e}")),
        );

        let state = Arc::new(AppState::new(
            config,
            credentials.clone(),
            hasher.clone(),
            purchase_orders.clone(),
        ));

        TestContext {
            state,
            credentials,
            hasher,
            purchase_orders,
        }
    }

    /// Router over fresh, empty in-memory stores
    pub fn create_router_for_testing() -> Router {
        create_router(create_test_context().state)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use testing::create_router_for_testing;
