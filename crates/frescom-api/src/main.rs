//! Frescom API Server
//!
//! REST API server for the login/provisioning flow and purchase orders.

use anyhow::Context;
use frescom_api::auth::{build_hasher, PgCredentialStore};
use frescom_api::purchase::PgPurchaseOrderStore;
use frescom_api::{create_router, state::AppState};
use frescom_core::config::{AppConfig, LoggingConfig};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("FRESCOM_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json_format {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    let pool = PgPoolOptions::new()
        .max_connections(config.database.pool_size)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect(&config.database.url)
        .await
        .context("PostgreSQL connection failed")?;

    let hasher = build_hasher(&config.password, pool.clone())?;
    tracing::info!(backend = ?config.password.backend, "password hasher ready");

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = Arc::new(AppState::new(
        config,
        Arc::new(PgCredentialStore::new(pool.clone())),
        hasher,
        Arc::new(PgPurchaseOrderStore::new(pool)),
    ));

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Frescom API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
