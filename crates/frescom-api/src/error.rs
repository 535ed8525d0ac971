//! API error handling

use crate::auth::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new("NOT_FOUND", format!("{resource} not found"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Forbidden(String),
    Database(String),
    Auth(AuthError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg)),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ApiError::new("FORBIDDEN", msg)),
            // Cause is logged, never echoed to the client
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("DATABASE_ERROR", "Database operation failed"),
                )
            }
            AppError::Auth(err) => return err.into_response(),
        };

        (status, Json(error)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<frescom_core::FrescomError> for AppError {
    fn from(err: frescom_core::FrescomError) -> Self {
        use frescom_core::FrescomError;

        match err {
            FrescomError::AccessDenied { reason } => AppError::Forbidden(reason),
            FrescomError::ValidationError(msg) => AppError::BadRequest(msg),
            FrescomError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frescom_core::FrescomError;

    #[test]
    fn test_core_error_mapping() {
        let response = AppError::from(FrescomError::ValidationError("qty".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::from(FrescomError::AccessDenied {
            reason: "no program".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = AppError::from(FrescomError::DatabaseError("boom".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_database_cause_not_echoed() {
        let response = AppError::from(FrescomError::DatabaseError("relation po2 missing".into()))
            .into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "DATABASE_ERROR");
        assert!(!error.message.contains("po2"));
    }

    #[test]
    fn test_auth_error_passes_through() {
        let response = AppError::from(AuthError::InvalidToken).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response
            .headers()
            .get(axum::http::header::WWW_AUTHENTICATE)
            .is_some());
    }

    #[test]
    fn test_details_skipped_when_absent() {
        let json = serde_json::to_string(&ApiError::internal_error()).unwrap();
        assert!(!json.contains("details"));
    }
}
