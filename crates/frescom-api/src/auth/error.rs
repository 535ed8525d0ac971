//! Authentication error taxonomy
//!
//! Pending login states (password entry, confirmation, missing program) are
//! not errors; see [`AuthOutcome`](super::resolver::AuthOutcome).

use crate::error::ApiError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Authentication and session errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Account not found")]
    AccountNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing Authorization header")]
    MissingAuthHeader,

    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    /// Bad signature, malformed, expired, or the account is gone
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Credential storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Password hashing failed: {0}")]
    PasswordHashing(String),

    #[error("Token encoding failed: {0}")]
    TokenEncoding(String),
}

impl AuthError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::AccountNotFound => StatusCode::NOT_FOUND,
            AuthError::InvalidCredentials => StatusCode::FORBIDDEN,
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::StorageUnavailable(_)
            | AuthError::PasswordHashing(_)
            | AuthError::TokenEncoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short tag for logs and audit events
    pub fn tag(&self) -> &'static str {
        match self {
            AuthError::AccountNotFound => "account_not_found",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::InvalidToken => "invalid_token",
            AuthError::StorageUnavailable(_) => "storage_unavailable",
            AuthError::PasswordHashing(_) => "password_hashing",
            AuthError::TokenEncoding(_) => "token_encoding",
        }
    }

    fn body(&self) -> ApiError {
        match self {
            AuthError::AccountNotFound => ApiError::not_found("User"),
            AuthError::InvalidCredentials => ApiError::new(
                "INVALID_CREDENTIALS",
                "Invalid credentials. Please check your password.",
            ),
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidToken => {
                ApiError::new("UNAUTHORIZED", "Could not validate credentials")
            }
            AuthError::StorageUnavailable(_) => {
                ApiError::new("DATABASE_ERROR", "Database operation failed")
            }
            AuthError::PasswordHashing(_) | AuthError::TokenEncoding(_) => {
                ApiError::internal_error()
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "authentication failed internally");
        }

        let mut response = (status, Json(self.body())).into_response();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
