//! Credential store adapter
//!
//! Parameterized lookups against the account table (`sass`) and the
//! program-assignment view (`sass3_co_view`). All lookups compare logins
//! case-insensitively. "Not found" is a normal result; only infrastructure
//! failures surface as [`StoreError`].

use async_trait::async_trait;
use frescom_core::Account;
use sqlx::{FromRow, PgPool};
use thiserror::Error;

/// Grade recorded for accounts whose grade column is NULL.
/// Anything non-zero is subject to the program check.
pub const UNGRADED: i32 = -1;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Read/write access to account credentials
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an account by login
    async fn find_account(&self, login: &str) -> Result<Option<Account>, StoreError>;

    /// Whether the login has at least one program assigned
    async fn has_tenant_assignment(&self, login: &str) -> Result<bool, StoreError>;

    /// Whether the account exists and has no password set yet
    async fn account_password_is_unset(&self, login: &str) -> Result<bool, StoreError>;

    /// Overwrite the stored password digest
    async fn set_password_hash(&self, login: &str, digest: &str) -> Result<(), StoreError>;
}

/// Account row from database
#[derive(Debug, FromRow)]
struct AccountRow {
    login: String,
    co_code: Option<String>,
    password: Option<String>,
    grade: Option<i32>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            login: row.login,
            tenant_code: row.co_code,
            password_hash: row.password,
            grade: row.grade.unwrap_or(UNGRADED),
        }
    }
}

/// PostgreSQL credential store
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Create from an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_account(&self, login: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT btrim(login::text) AS login, co_code::text AS co_code,
                   password::text AS password, grade::int4 AS grade
            FROM sass
            WHERE lower(login) = lower($1)
            LIMIT 1
            "#,
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Account::from))
    }

    async fn has_tenant_assignment(&self, login: &str) -> Result<bool, StoreError> {
        let assigned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM sass3_co_view WHERE lower(login) = lower($1))",
        )
        .bind(login)
        .fetch_one(&self.pool)
        .await?;

        Ok(assigned)
    }

    async fn account_password_is_unset(&self, login: &str) -> Result<bool, StoreError> {
        let unset = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM sass
                WHERE lower(login) = lower($1)
                  AND (password IS NULL OR btrim(password::text) = '')
            )
            "#,
        )
        .bind(login)
        .fetch_one(&self.pool)
        .await?;

        Ok(unset)
    }

    async fn set_password_hash(&self, login: &str, digest: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE sass SET password = $2 WHERE lower(login) = lower($1)")
            .bind(login)
            .bind(digest)
            .execute(&self.pool)
            .await?;

        tracing::debug!(login = %login, rows = result.rows_affected(), "password digest stored");
        Ok(())
    }
}

/// In-memory credential store for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod memory {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::RwLock;

    /// Credential store backed by maps, keyed by lowercased login
    #[derive(Default)]
    pub struct InMemoryCredentialStore {
        accounts: RwLock<HashMap<String, Account>>,
        assignments: RwLock<HashSet<String>>,
        unavailable: AtomicBool,
    }

    impl InMemoryCredentialStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add or replace an account
        pub async fn insert_account(&self, account: Account) {
            let key = account.login.to_lowercase();
            self.accounts.write().await.insert(key, account);
        }

        /// Assign a program to a login
        pub async fn assign_program(&self, login: &str) {
            self.assignments.write().await.insert(login.to_lowercase());
        }

        /// Delete an account (simulates out-of-band removal)
        pub async fn remove_account(&self, login: &str) {
            self.accounts.write().await.remove(&login.to_lowercase());
        }

        /// Stored digest for a login, if any
        pub async fn password_hash(&self, login: &str) -> Option<String> {
            self.accounts
                .read()
                .await
                .get(&login.to_lowercase())
                .and_then(|account| account.password_hash.clone())
        }

        /// Make every call fail as if the database were down
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        fn check_available(&self) -> Result<(), StoreError> {
            if self.unavailable.load(Ordering::SeqCst) {
                Err(StoreError::Unavailable("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl CredentialStore for InMemoryCredentialStore {
        async fn find_account(&self, login: &str) -> Result<Option<Account>, StoreError> {
            self.check_available()?;
            Ok(self.accounts.read().await.get(&login.to_lowercase()).cloned())
        }

        async fn has_tenant_assignment(&self, login: &str) -> Result<bool, StoreError> {
            self.check_available()?;
            Ok(self.assignments.read().await.contains(&login.to_lowercase()))
        }

        async fn account_password_is_unset(&self, login: &str) -> Result<bool, StoreError> {
            self.check_available()?;
            Ok(self
                .accounts
                .read()
                .await
                .get(&login.to_lowercase())
                .is_some_and(Account::password_is_unset))
        }

        async fn set_password_hash(&self, login: &str, digest: &str) -> Result<(), StoreError> {
            self.check_available()?;
            if let Some(account) = self.accounts.write().await.get_mut(&login.to_lowercase()) {
                account.password_hash = Some(digest.to_string());
            }
            Ok(())
        }
    }
}
