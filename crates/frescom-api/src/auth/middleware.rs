/// Authentication middleware for protecting routes
///
/// Extracts and verifies the bearer token from the Authorization header.
/// On success, adds the caller's [`Identity`] to request extensions.
use super::error::AuthError;
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use frescom_core::Identity;
use std::sync::Arc;

/// Pull the bearer token out of the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let (scheme, token) = auth_header
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token.trim())
}

/// Authentication middleware that requires a valid access token
///
/// ```ignore
/// let protected = Router::new()
///     .route("/auth/me", get(me_handler))
///     .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
///
/// In handlers, extract the identity with `Extension<Identity>`.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let identity: Identity = match bearer_token(request.headers()) {
        Ok(token) => state.verifier.verify(token).await,
        Err(e) => Err(e),
    }
    .map_err(|e| {
        if !matches!(e, AuthError::StorageUnavailable(_)) {
            audit_log(&AuditEvent::InvalidToken {
                ip_address: extract_ip_address(request.headers()),
                user_agent: extract_user_agent(request.headers()),
                reason: e.tag().to_string(),
            });
        }
        e
    })?;

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
