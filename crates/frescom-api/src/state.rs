//! Application state management

use crate::auth::{
    AuthResolver, CredentialStore, JwtConfig, PasswordHasher, SessionVerifier, TokenIssuer,
};
use crate::purchase::PurchaseOrderStore;
use frescom_core::config::AppConfig;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Login state resolution
    pub resolver: AuthResolver,
    /// Access token issuing
    pub issuer: TokenIssuer,
    /// Bearer token verification for protected routes
    pub verifier: SessionVerifier,
    /// Purchase order storage
    pub purchase_orders: Arc<dyn PurchaseOrderStore>,
}

impl AppState {
    /// Wire the auth components and stores together
    pub fn new(
        config: AppConfig,
        credentials: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        purchase_orders: Arc<dyn PurchaseOrderStore>,
    ) -> Self {
        let jwt = JwtConfig::from(&config.auth);

        Self {
            resolver: AuthResolver::new(credentials.clone(), hasher),
            issuer: TokenIssuer::new(jwt.clone()),
            verifier: SessionVerifier::new(jwt, credentials),
            purchase_orders,
            start_time: Instant::now(),
            config,
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
