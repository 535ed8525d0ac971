//! Frescom Core - Domain models, configuration and shared error types
//!
//! This crate defines the abstractions shared by the API server:
//! - Account and identity models for the login/provisioning flow
//! - Purchase order models and their validation rules
//! - Common error types
//! - Configuration management

pub mod config;
pub mod purchase_order;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, HasherBackend, LoggingConfig,
    PasswordConfig, ServerConfig,
};
pub use purchase_order::{
    CreatedPurchaseOrder, NewPurchaseOrder, PurchaseOrderHeader, PurchaseOrderLine,
    PurchaseOrderSummary,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Frescom operations
#[derive(Error, Debug)]
pub enum FrescomError {
    #[error("Access denied: {reason}")]
    AccessDenied { reason: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

pub type Result<T> = std::result::Result<T, FrescomError>;

// ============================================================================
// Accounts
// ============================================================================

/// Normalize a login name for lookup.
///
/// Logins are matched case-insensitively and surrounding whitespace is
/// ignored. Returns `None` when nothing is left after trimming.
pub fn normalize_login(login: &str) -> Option<String> {
    let trimmed = login.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// A user account as provisioned out-of-band in the `sass` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Login name as stored (lookups are case-insensitive)
    pub login: String,

    /// Tenant / program code (`co_code`)
    pub tenant_code: Option<String>,

    /// Stored password digest; `None` or empty means not yet provisioned
    pub password_hash: Option<String>,

    /// Privilege grade; `0` is exempt from the program check
    pub grade: i32,
}

impl Account {
    /// Create an account without a password
    pub fn new(login: impl Into<String>, tenant_code: Option<&str>, grade: i32) -> Self {
        Self {
            login: login.into(),
            tenant_code: tenant_code.map(str::to_string),
            password_hash: None,
            grade,
        }
    }

    /// Builder-style setter for the stored digest
    pub fn with_password_hash(mut self, digest: impl Into<String>) -> Self {
        self.password_hash = Some(digest.into());
        self
    }

    /// Whether the password has never been set
    pub fn password_is_unset(&self) -> bool {
        self.password_hash
            .as_deref()
            .map_or(true, |digest| digest.trim().is_empty())
    }

    /// Whether this account must have a program assigned before it gets a session
    pub fn requires_program(&self) -> bool {
        self.grade != 0
    }
}

/// Identity re-established from a verified access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    /// Login name (token subject)
    pub login: String,

    /// Tenant / program code carried in the token
    pub tenant_code: Option<String>,
}

impl Identity {
    /// Tenant code, or an access error when the identity has none
    pub fn require_tenant(&self) -> Result<&str> {
        self.tenant_code
            .as_deref()
            .filter(|code| !code.is_empty())
            .ok_or_else(|| FrescomError::AccessDenied {
                reason: "No program is assigned to this login".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_login() {
        assert_eq!(normalize_login("Alice "), Some("alice".to_string()));
        assert_eq!(normalize_login("  BOB"), Some("bob".to_string()));
        assert_eq!(normalize_login("   "), None);
        assert_eq!(normalize_login(""), None);
    }

    #[test]
    fn test_password_unset_states() {
        let account = Account::new("carol", Some("01"), 1);
        assert!(account.password_is_unset());

        let blank = account.clone().with_password_hash("  ");
        assert!(blank.password_is_unset());

        let set = account.with_password_hash("digest");
        assert!(!set.password_is_unset());
    }

    #[test]
    fn test_grade_zero_is_exempt() {
        assert!(!Account::new("admin", None, 0).requires_program());
        assert!(Account::new("dave", None, 5).requires_program());
    }

    #[test]
    fn test_identity_requires_tenant() {
        let identity = Identity {
            login: "bob".to_string(),
            tenant_code: Some("07".to_string()),
        };
        assert_eq!(identity.require_tenant().unwrap(), "07");

        let orphan = Identity {
            login: "bob".to_string(),
            tenant_code: None,
        };
        assert!(matches!(
            orphan.require_tenant(),
            Err(FrescomError::AccessDenied { .. })
        ));
    }

    proptest::proptest! {
        #[test]
        fn normalized_login_is_trimmed_lowercase(login in "[ a-zA-Z0-9_.]{0,24}") {
            match normalize_login(&login) {
                Some(key) => {
                    proptest::prop_assert_eq!(key.trim(), key.as_str());
                    proptest::prop_assert_eq!(key.to_lowercase(), key.clone());
                    proptest::prop_assert_eq!(normalize_login(&key), Some(key.clone()));
                }
                None => proptest::prop_assert!(login.trim().is_empty()),
            }
        }
    }
}
