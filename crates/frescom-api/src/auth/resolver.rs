//! Authentication state resolver
//!
//! A single login entry point serves three flows: provisioning a password
//! for a brand-new account, confirming a freshly typed password, and
//! ordinary sign-in. The resolver decides which state an account is in and
//! returns an [`AuthOutcome`]; only `Authenticated` leads to a token.

use super::error::AuthError;
use super::password::{PasswordError, PasswordHasher};
use super::store::{CredentialStore, StoreError};
use frescom_core::{normalize_login, Account};
use std::sync::Arc;

/// Message shown when a password must be entered
pub const ENTER_PASSWORD_MESSAGE: &str = "Enter the password";

/// Message shown when the login has no program assigned
pub const NO_PROGRAM_MESSAGE: &str = "there is no program created under this log in.";

/// Message shown when a new password must be confirmed
pub const CONFIRM_PASSWORD_MESSAGE: &str = "Confirm password";

/// Result of a login attempt that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Caller must collect a password
    NeedsPasswordEntry,
    /// Caller must re-submit the new password with `password_update`
    NeedsPasswordConfirmation,
    /// Account has no program (tenant) assigned yet
    NoProgramProvisioned,
    /// Credentials accepted
    Authenticated { account: Account, new_user: bool },
}

impl AuthOutcome {
    /// User-facing message for the pending states
    pub fn message(&self) -> Option<&'static str> {
        match self {
            AuthOutcome::NeedsPasswordEntry => Some(ENTER_PASSWORD_MESSAGE),
            AuthOutcome::NeedsPasswordConfirmation => Some(CONFIRM_PASSWORD_MESSAGE),
            AuthOutcome::NoProgramProvisioned => Some(NO_PROGRAM_MESSAGE),
            AuthOutcome::Authenticated { .. } => None,
        }
    }

    /// Short tag for logs and audit events
    pub fn tag(&self) -> &'static str {
        match self {
            AuthOutcome::NeedsPasswordEntry => "needs_password_entry",
            AuthOutcome::NeedsPasswordConfirmation => "needs_password_confirmation",
            AuthOutcome::NoProgramProvisioned => "no_program_provisioned",
            AuthOutcome::Authenticated { .. } => "authenticated",
        }
    }

    fn signed_in(account: Account) -> Self {
        AuthOutcome::Authenticated {
            account,
            new_user: false,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AuthError::StorageUnavailable(msg),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::BackendUnavailable(msg) => AuthError::StorageUnavailable(msg),
            other => AuthError::PasswordHashing(other.to_string()),
        }
    }
}

/// Decides account state and required action for a login attempt
#[derive(Clone)]
pub struct AuthResolver {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl AuthResolver {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { store, hasher }
    }

    /// Resolve a login attempt
    ///
    /// `password` may be empty, meaning the caller is probing the account
    /// state. When `password_update` is set, the digest of `password` is
    /// stored before any other check runs.
    ///
    /// # Errors
    ///
    /// * `AccountNotFound` - empty login or no such account
    /// * `InvalidCredentials` - password does not match the stored digest
    /// * `StorageUnavailable` / `PasswordHashing` - infrastructure failures
    pub async fn authenticate(
        &self,
        login: &str,
        password: &str,
        password_update: bool,
    ) -> Result<AuthOutcome, AuthError> {
        let key = normalize_login(login).ok_or(AuthError::AccountNotFound)?;

        let mut account = self
            .store
            .find_account(&key)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        if password_update {
            let digest = self.hasher.hash(password).await?;
            self.store.set_password_hash(&key, &digest).await?;
            tracing::info!(login = %key, "password digest updated");

            // Continue with the stored state, not the stale copy
            account = self
                .store
                .find_account(&key)
                .await?
                .ok_or(AuthError::AccountNotFound)?;
        }

        let password_unset = self.store.account_password_is_unset(&key).await?;

        match (password_unset, password.is_empty()) {
            (false, true) => return Ok(AuthOutcome::NeedsPasswordEntry),
            (true, true) => {
                return Ok(if self.store.has_tenant_assignment(&key).await? {
                    AuthOutcome::signed_in(account)
                } else {
                    AuthOutcome::NeedsPasswordEntry
                });
            }
            (true, false) => return Ok(AuthOutcome::NeedsPasswordConfirmation),
            (false, false) => {}
        }

        let digest = account.password_hash.as_deref().unwrap_or_default();
        if !self.hasher.verify(password, digest).await? {
            return Err(AuthError::InvalidCredentials);
        }

        if account.requires_program() && !self.store.has_tenant_assignment(&key).await? {
            return Ok(AuthOutcome::NoProgramProvisioned);
        }

        Ok(AuthOutcome::signed_in(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::Argon2Hasher;
    use crate::auth::store::memory::InMemoryCredentialStore;
    use proptest::prelude::*;

    fn hasher() -> Arc<Argon2Hasher> {
        Arc::new(Argon2Hasher::new(b"resolver-test-salt", 8, 1, 1).unwrap())
    }

    async fn setup() -> (Arc<InMemoryCredentialStore>, Arc<Argon2Hasher>, AuthResolver) {
        let store = Arc::new(InMemoryCredentialStore::new());
        let hasher = hasher();
        let resolver = AuthResolver::new(store.clone(), hasher.clone());
        (store, hasher, resolver)
    }

    async fn with_password(hasher: &Argon2Hasher, account: Account, password: &str) -> Account {
        let digest = hasher.hash(password).await.unwrap();
        account.with_password_hash(digest)
    }

    #[tokio::test]
    async fn test_unknown_login_is_not_found() {
        let (_, _, resolver) = setup().await;

        let result = resolver.authenticate("Alice ", "", false).await;
        assert!(matches!(result, Err(AuthError::AccountNotFound)));

        let result = resolver.authenticate("Alice ", "secret", false).await;
        assert!(matches!(result, Err(AuthError::AccountNotFound)));
    }

    #[tokio::test]
    async fn test_blank_login_is_not_found() {
        let (_, _, resolver) = setup().await;
        let result = resolver.authenticate("   ", "secret", false).await;
        assert!(matches!(result, Err(AuthError::AccountNotFound)));
    }

    #[tokio::test]
    async fn test_unset_password_with_program_signs_in() {
        let (store, _, resolver) = setup().await;
        store.insert_account(Account::new("bob", Some("07"), 1)).await;
        store.assign_program("bob").await;

        let outcome = resolver.authenticate("bob", "", false).await.unwrap();
        assert!(matches!(
            outcome,
            AuthOutcome::Authenticated { new_user: false, ref account } if account.login == "bob"
        ));
    }

    #[tokio::test]
    async fn test_unset_password_without_program_asks_for_password() {
        let (store, _, resolver) = setup().await;
        store.insert_account(Account::new("bob", Some("07"), 1)).await;

        let outcome = resolver.authenticate("bob", "", false).await.unwrap();
        assert_eq!(outcome, AuthOutcome::NeedsPasswordEntry);
    }

    #[tokio::test]
    async fn test_set_password_with_empty_input_asks_for_password() {
        let (store, hasher, resolver) = setup().await;
        let account = with_password(&hasher, Account::new("carol", Some("01"), 1), "secret").await;
        store.insert_account(account).await;
        store.assign_program("carol").await;

        let outcome = resolver.authenticate("carol", "", false).await.unwrap();
        assert_eq!(outcome, AuthOutcome::NeedsPasswordEntry);
    }

    #[tokio::test]
    async fn test_new_password_needs_confirmation_without_writing() {
        let (store, _, resolver) = setup().await;
        store.insert_account(Account::new("erin", Some("01"), 1)).await;

        let outcome = resolver.authenticate("erin", "fresh", false).await.unwrap();
        assert_eq!(outcome, AuthOutcome::NeedsPasswordConfirmation);
        assert_eq!(store.password_hash("erin").await, None);
    }

    #[tokio::test]
    async fn test_confirmation_with_update_signs_in() {
        let (store, hasher, resolver) = setup().await;
        store.insert_account(Account::new("erin", Some("01"), 1)).await;
        store.assign_program("erin").await;

        let outcome = resolver.authenticate("erin", "fresh", true).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Authenticated { .. }));

        let stored = store.password_hash("erin").await.unwrap();
        assert_eq!(stored, hasher.hash("fresh").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_overwrites_previous_password() {
        let (store, hasher, resolver) = setup().await;
        let account = with_password(&hasher, Account::new("carol", Some("01"), 0), "old").await;
        store.insert_account(account).await;

        resolver.authenticate("carol", "new", true).await.unwrap();

        let result = resolver.authenticate("carol", "old", false).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        let outcome = resolver.authenticate("carol", "new", false).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Authenticated { .. }));
    }

    #[tokio::test]
    async fn test_update_is_persisted_before_the_password_check() {
        let (store, hasher, resolver) = setup().await;
        let account = with_password(&hasher, Account::new("dave", None, 5), "secret").await;
        store.insert_account(account).await;

        // Rejected by the program gate, but the write already happened
        let outcome = resolver.authenticate("dave", "rotated", true).await.unwrap();
        assert_eq!(outcome, AuthOutcome::NoProgramProvisioned);
        assert_eq!(
            store.password_hash("dave").await.unwrap(),
            hasher.hash("rotated").await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_wrong_password_is_invalid_credentials() {
        let (store, hasher, resolver) = setup().await;
        let account = with_password(&hasher, Account::new("carol", Some("01"), 1), "secret").await;
        store.insert_account(account).await;
        store.assign_program("carol").await;

        let result = resolver.authenticate("carol", "wrong", false).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_privileged_account_without_program_is_gated() {
        let (store, hasher, resolver) = setup().await;
        let account = with_password(&hasher, Account::new("dave", None, 5), "secret").await;
        store.insert_account(account).await;

        let outcome = resolver.authenticate("dave", "secret", false).await.unwrap();
        assert_eq!(outcome, AuthOutcome::NoProgramProvisioned);
        assert_eq!(outcome.message(), Some(NO_PROGRAM_MESSAGE));
    }

    #[tokio::test]
    async fn test_grade_zero_skips_program_gate() {
        let (store, hasher, resolver) = setup().await;
        let account = with_password(&hasher, Account::new("root", None, 0), "secret").await;
        store.insert_account(account).await;

        let outcome = resolver.authenticate("ROOT ", "secret", false).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Authenticated { new_user: false, .. }));
    }

    #[tokio::test]
    async fn test_storage_failure_is_not_not_found() {
        let (store, _, resolver) = setup().await;
        store.set_unavailable(true);

        let result = resolver.authenticate("bob", "", false).await;
        assert!(matches!(result, Err(AuthError::StorageUnavailable(_))));
    }

    #[test]
    fn test_outcome_messages() {
        assert_eq!(
            AuthOutcome::NeedsPasswordEntry.message(),
            Some("Enter the password")
        );
        assert_eq!(
            AuthOutcome::NeedsPasswordConfirmation.message(),
            Some("Confirm password")
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_unknown_login_never_authenticates(login in "[a-zA-Z ]{1,16}", password in ".{0,16}") {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result = rt.block_on(async {
                let (_, _, resolver) = setup().await;
                resolver.authenticate(&login, &password, false).await
            });
            prop_assert!(matches!(result, Err(AuthError::AccountNotFound)));
        }

        #[test]
        fn prop_gated_account_never_authenticates(grade in 1i32..100, assigned in any::<bool>()) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let outcome = rt.block_on(async {
                let (store, hasher, resolver) = setup().await;
                let account = with_password(&hasher, Account::new("gina", None, grade), "pw").await;
                store.insert_account(account).await;
                if assigned {
                    store.assign_program("gina").await;
                }
                resolver.authenticate("gina", "pw", false).await.unwrap()
            });

            if assigned {
                prop_assert!(matches!(outcome, AuthOutcome::Authenticated { .. }), "expected Authenticated, got {:?}", outcome);
            } else {
                prop_assert_eq!(outcome, AuthOutcome::NoProgramProvisioned);
            }
        }
    }
}
