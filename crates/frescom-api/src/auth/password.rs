//! Password digests
//!
//! Digests are deterministic: the same plaintext always produces the same
//! digest, so verification re-hashes the candidate and compares. Two backends:
//! - `SqlFunctionHasher`: delegates to a server-side SQL function (e.g. `f.encode`)
//! - `Argon2Hasher`: Argon2id computed locally with a fixed, configured salt
use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use base64::Engine;
use frescom_core::{HasherBackend, PasswordConfig};
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Hash backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalid hasher configuration: {0}")]
    InvalidConfig(String),
}

/// One-way password digest
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Compute the digest of a plaintext password
    async fn hash(&self, plaintext: &str) -> Result<String, PasswordError>;

    /// Re-hash `plaintext` and compare with a stored digest
    async fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, PasswordError> {
        let candidate = self.hash(plaintext).await?;
        Ok(candidate == digest.trim())
    }
}

/// Build the hasher selected by configuration
pub fn build_hasher(
    config: &PasswordConfig,
    pool: PgPool,
) -> Result<Arc<dyn PasswordHasher>, PasswordError> {
    Ok(match config.backend {
        HasherBackend::Database => Arc::new(SqlFunctionHasher::new(pool, &config.sql_function)?),
        HasherBackend::Argon2 => Arc::new(Argon2Hasher::from_config(config)?),
    })
}

/// Digest computed by a server-side SQL function
#[derive(Clone)]
pub struct SqlFunctionHasher {
    pool: PgPool,
    function: String,
}

impl SqlFunctionHasher {
    /// Create a hasher calling `function` (a plain or schema-qualified name)
    pub fn new(pool: PgPool, function: &str) -> Result<Self, PasswordError> {
        if !is_sql_identifier(function) {
            return Err(PasswordError::InvalidConfig(format!(
                "'{function}' is not a valid SQL function name"
            )));
        }

        Ok(Self {
            pool,
            function: function.to_string(),
        })
    }
}

#[async_trait]
impl PasswordHasher for SqlFunctionHasher {
    async fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let sql = format!("SELECT {}($1)::text", self.function);

        let digest = sqlx::query_scalar::<_, Option<String>>(&sql)
            .bind(plaintext)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PasswordError::BackendUnavailable(e.to_string()))?;

        digest.ok_or_else(|| PasswordError::HashingFailed(format!("{} returned NULL", self.function)))
    }
}

/// `name` or `schema.name`, letters/digits/underscore, not starting with a digit
fn is_sql_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Argon2id digest with a fixed salt
#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
    salt: Vec<u8>,
}

impl Argon2Hasher {
    /// Output length in bytes
    const OUTPUT_LEN: usize = 32;

    /// Create a hasher with explicit Argon2 parameters
    pub fn new(
        salt: &[u8],
        memory_cost: u32,
        time_cost: u32,
        parallelism: u32,
    ) -> Result<Self, PasswordError> {
        if salt.len() < argon2::MIN_SALT_LEN {
            return Err(PasswordError::InvalidConfig(format!(
                "salt must be at least {} bytes",
                argon2::MIN_SALT_LEN
            )));
        }

        let params = Params::new(memory_cost, time_cost, parallelism, Some(Self::OUTPUT_LEN))
            .map_err(|e| PasswordError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            params,
            salt: salt.to_vec(),
        })
    }

    /// Create from the password section of the app config
    pub fn from_config(config: &PasswordConfig) -> Result<Self, PasswordError> {
        Self::new(
            config.salt.as_bytes(),
            config.memory_cost,
            config.time_cost,
            config.parallelism,
        )
    }

    fn digest(&self, plaintext: &[u8]) -> Result<String, PasswordError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let mut output = [0u8; Self::OUTPUT_LEN];
        argon2
            .hash_password_into(plaintext, &self.salt, &mut output)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(base64::engine::general_purpose::STANDARD_NO_PAD.encode(output))
    }
}

#[async_trait]
impl PasswordHasher for Argon2Hasher {
    async fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let hasher = self.clone();
        let plaintext = plaintext.as_bytes().to_vec();

        // Argon2 is CPU-bound; keep it off the async workers
        tokio::task::spawn_blocking(move || hasher.digest(&plaintext))
            .await
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Minimal Argon2 cost so tests stay fast
    fn test_hasher() -> Argon2Hasher {
        Argon2Hasher::new(b"test-salt-value", 8, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn test_hash_and_verify_password() {
        let hasher = test_hasher();
        let digest = hasher.hash("secret").await.expect("Failed to hash password");

        assert!(hasher.verify("secret", &digest).await.unwrap());
        assert!(!hasher.verify("wrong", &digest).await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_is_deterministic() {
        let hasher = test_hasher();
        let first = hasher.hash("SamePassword123!").await.unwrap();
        let second = hasher.hash("SamePassword123!").await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first, "SamePassword123!");
    }

    #[tokio::test]
    async fn test_salt_changes_digest() {
        let other = Argon2Hasher::new(b"another-salt", 8, 1, 1).unwrap();
        assert_ne!(
            test_hasher().hash("secret").await.unwrap(),
            other.hash("secret").await.unwrap()
        );
    }

    #[test]
    fn test_short_salt_rejected() {
        assert!(matches!(
            Argon2Hasher::new(b"short", 8, 1, 1),
            Err(PasswordError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_sql_identifier() {
        assert!(is_sql_identifier("f.encode"));
        assert!(is_sql_identifier("encode_pwd"));
        assert!(!is_sql_identifier(""));
        assert!(!is_sql_identifier("f."));
        assert!(!is_sql_identifier("1abc"));
        assert!(!is_sql_identifier("encode($1); DROP TABLE sass; --"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_verify_accepts_only_the_hashed_password(p in ".{0,24}", q in ".{0,24}") {
            let hasher = test_hasher();
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let digest = hasher.hash(&p).await.unwrap();
                prop_assert!(hasher.verify(&p, &digest).await.unwrap());
                prop_assert_eq!(hasher.verify(&q, &digest).await.unwrap(), p == q);
                Ok(())
            })?;
        }
    }
}
