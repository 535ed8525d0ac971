//! Authentication and session module
//!
//! - Credential store adapter over the account table and program view
//! - Deterministic password digests (SQL function or Argon2id)
//! - Login state resolution
//! - JWT issuing and bearer-token verification middleware

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod resolver;
pub mod store;
pub mod verifier;

pub use error::AuthError;
pub use jwt::{validate_access_token, Claims, Credential, JwtConfig, JwtError, TokenIssuer};
pub use middleware::auth_middleware;
pub use password::{build_hasher, Argon2Hasher, PasswordError, PasswordHasher, SqlFunctionHasher};
pub use resolver::{AuthOutcome, AuthResolver};
pub use store::{CredentialStore, PgCredentialStore, StoreError};
pub use verifier::SessionVerifier;

#[cfg(any(test, feature = "test-utils"))]
pub use store::memory::InMemoryCredentialStore;
