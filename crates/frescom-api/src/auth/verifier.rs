//! Session/identity verification for bearer tokens

use super::error::AuthError;
use super::jwt::{validate_access_token, JwtConfig};
use super::store::CredentialStore;
use frescom_core::Identity;
use std::sync::Arc;

/// Re-establishes the caller's identity from an access token
#[derive(Clone)]
pub struct SessionVerifier {
    config: JwtConfig,
    store: Arc<dyn CredentialStore>,
}

impl SessionVerifier {
    pub fn new(config: JwtConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self { config, store }
    }

    /// Decode and validate `token`, then confirm the account still exists.
    ///
    /// Signature, format and expiry failures all collapse into
    /// [`AuthError::InvalidToken`]; so does a token for a deleted account.
    pub async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = validate_access_token(&self.config, token).map_err(|e| {
            tracing::debug!(reason = %e, "token rejected");
            AuthError::InvalidToken
        })?;

        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }

        if self.store.find_account(&claims.sub).await?.is_none() {
            tracing::debug!(login = %claims.sub, "token subject no longer exists");
            return Err(AuthError::InvalidToken);
        }

        Ok(Identity {
            login: claims.sub,
            tenant_code: claims.co_code,
        })
    }
}
