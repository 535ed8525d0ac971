//! JWT token generation and validation
//!
//! Implements stateless access tokens with HMAC-SHA256 signing.
//! A token carries the login (`sub`), the tenant code (`co_code`) and an
//! absolute expiry (`exp`); nothing is persisted server-side.

use chrono::{DateTime, Duration, Utc};
use frescom_core::config::MAX_TOKEN_TTL_MINUTES;
use frescom_core::AuthConfig;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - login name
    pub sub: String,
    /// Tenant / program code
    #[serde(default)]
    pub co_code: Option<String>,
    /// Issued at timestamp (Unix epoch)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch)
    pub exp: i64,
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token lifetime out of range")]
    ExpiryOutOfRange,
}

/// JWT Configuration
///
/// Built once at startup and handed to the issuer and the verifier.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Access token lifetime
    pub access_ttl: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        // Config loading rejects larger values; clamp for hand-built configs
        let minutes = config.access_token_expire_minutes.min(MAX_TOKEN_TTL_MINUTES) as i64;
        Self {
            secret: config.jwt_secret.clone(),
            access_ttl: Duration::try_minutes(minutes).unwrap_or(Duration::zero()),
        }
    }
}

/// A signed access token and its absolute expiry
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues signed access tokens
#[derive(Clone)]
pub struct TokenIssuer {
    config: JwtConfig,
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: JwtConfig) -> Self {
        let key = EncodingKey::from_secret(config.secret.as_bytes());
        Self { config, key }
    }

    /// Configured access token lifetime
    pub fn default_ttl(&self) -> Duration {
        self.config.access_ttl
    }

    /// Issue a token with the configured lifetime
    pub fn issue_default(
        &self,
        login: &str,
        tenant_code: Option<&str>,
    ) -> Result<Credential, JwtError> {
        self.issue(login, tenant_code, self.config.access_ttl)
    }

    /// Issue a token valid for `ttl` from now
    pub fn issue(
        &self,
        login: &str,
        tenant_code: Option<&str>,
        ttl: Duration,
    ) -> Result<Credential, JwtError> {
        self.issue_at(login, tenant_code, ttl, Utc::now())
    }

    /// Issue a token as if it were created at `issued_at`
    pub fn issue_at(
        &self,
        login: &str,
        tenant_code: Option<&str>,
        ttl: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<Credential, JwtError> {
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or(JwtError::ExpiryOutOfRange)?;
        let claims = Claims {
            sub: login.to_string(),
            co_code: tenant_code.map(str::to_string),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key)?;

        Ok(Credential { token, expires_at })
    }
}

/// Validate a JWT access token and extract claims
///
/// Expiry is checked without leeway.
pub fn validate_access_token(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken,
    })?;

    Ok(token_data.claims)
}
