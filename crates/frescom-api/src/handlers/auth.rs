//! Authentication API handlers
//!
//! One login endpoint drives password provisioning, password confirmation
//! and ordinary sign-in. Pending states are answered with a message and a
//! non-200 status so the client knows which form to show next.

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::{AuthError, AuthOutcome};
use crate::error::{ApiError, AppError};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use frescom_core::Identity;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Login name (matched case-insensitively)
    pub username: String,
    /// Password; omit or leave empty to check the account state
    #[serde(default)]
    pub password: Option<String>,
    /// Store `password` as the account's new password before signing in
    #[serde(default)]
    pub password_update: Option<bool>,
}

/// Successful sign-in
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub new_user: bool,
}

/// Sign-in accepted for an account that still has to finish provisioning
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NewUserResponse {
    pub new_user: bool,
}

fn pending_response(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(ApiError::new(code, message))).into_response()
}

/// Login, provision or confirm a password
///
/// # Responses
///
/// * `200 OK` - token issued (or `{new_user: true}`)
/// * `202 Accepted` - new password must be confirmed
/// * `400 Bad Request` - password required, or no program assigned
/// * `403 Forbidden` - wrong password
/// * `404 Not Found` - unknown login
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 202, description = "Confirm password", body = ApiError),
        (status = 400, description = "Password required or no program assigned", body = ApiError),
        (status = 403, description = "Invalid credentials", body = ApiError),
        (status = 404, description = "Unknown login", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let password = request.password.as_deref().unwrap_or_default();
    let password_update = request.password_update.unwrap_or(false);
    let login = request.username.trim().to_lowercase();
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    let outcome = match state
        .resolver
        .authenticate(&request.username, password, password_update)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            if matches!(e, AuthError::AccountNotFound | AuthError::InvalidCredentials) {
                audit_log(&AuditEvent::LoginFailure {
                    login,
                    reason: e.tag().to_string(),
                    ip_address,
                    user_agent,
                });
            }
            return Err(e.into());
        }
    };

    if password_update {
        audit_log(&AuditEvent::PasswordSet {
            login: login.clone(),
            ip_address: ip_address.clone(),
        });
    }

    let (status, code) = match &outcome {
        AuthOutcome::Authenticated {
            new_user: true, ..
        } => return Ok(Json(NewUserResponse { new_user: true }).into_response()),
        AuthOutcome::Authenticated {
            account,
            new_user: false,
        } => {
            let credential = state
                .issuer
                .issue_default(&account.login, account.tenant_code.as_deref())
                .map_err(|e| AuthError::TokenEncoding(e.to_string()))?;

            audit_log(&AuditEvent::LoginSuccess {
                login: account.login.clone(),
                tenant_code: account.tenant_code.clone(),
                ip_address,
                user_agent,
            });

            return Ok(Json(TokenResponse {
                access_token: credential.token,
                token_type: "bearer".to_string(),
                new_user: false,
            })
            .into_response());
        }
        AuthOutcome::NeedsPasswordEntry => (StatusCode::BAD_REQUEST, "PASSWORD_REQUIRED"),
        AuthOutcome::NoProgramProvisioned => (StatusCode::BAD_REQUEST, "NO_PROGRAM"),
        AuthOutcome::NeedsPasswordConfirmation => (StatusCode::ACCEPTED, "CONFIRM_PASSWORD"),
    };

    audit_log(&AuditEvent::LoginPending {
        login,
        outcome: outcome.tag().to_string(),
        ip_address,
        user_agent,
    });
    let message = outcome.message().unwrap_or_default();

    Ok(pending_response(status, code, message))
}

/// Current identity from the bearer token
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Caller identity", body = Identity),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me_handler(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    Json(identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_optional_fields() {
        let request: LoginRequest = serde_json::from_str(r#"{"username": "bob"}"#).unwrap();
        assert_eq!(request.username, "bob");
        assert!(request.password.is_none());
        assert!(request.password_update.is_none());

        let request: LoginRequest =
            serde_json::from_str(r#"{"username": "bob", "password": null}"#).unwrap();
        assert!(request.password.is_none());
    }

    #[tokio::test]
    async fn test_pending_body_carries_code_and_message() {
        let response = pending_response(
            StatusCode::ACCEPTED,
            "CONFIRM_PASSWORD",
            AuthOutcome::NeedsPasswordConfirmation.message().unwrap_or_default(),
        );
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "CONFIRM_PASSWORD");
        assert!(!error.message.is_empty());
        assert!(error.details.is_none());
    }
}
