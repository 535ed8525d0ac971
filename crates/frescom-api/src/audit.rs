//! Security audit logging for authentication events
//!
//! All audit events are logged at INFO level with the "audit" target,
//! making them easy to filter and route to security monitoring systems.
//! Events carry login identifiers and outcome tags only; passwords,
//! digests and tokens are never part of an event.
//!
//! # Example
//!
//! ```ignore
//! use frescom_api::audit::{AuditEvent, audit_log};
//!
//! audit_log(&AuditEvent::LoginSuccess {
//!     login: "bob".to_string(),
//!     tenant_code: Some("07".to_string()),
//!     ip_address: Some("192.168.1.1".to_string()),
//!     user_agent: None,
//! });
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Token issued
    LoginSuccess {
        login: String,
        tenant_code: Option<String>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Login answered with a pending state (password entry, confirmation, no program)
    LoginPending {
        login: String,
        outcome: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Login rejected
    LoginFailure {
        login: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Password digest written through the login endpoint
    PasswordSet {
        login: String,
        ip_address: Option<String>,
    },

    /// Invalid, expired or orphaned token used
    InvalidToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
        reason: String,
    },

    /// Purchase order created
    PurchaseOrderCreated {
        login: String,
        tenant_code: String,
        sl_no: i64,
        po_no: String,
    },
}

/// Log a security audit event with structured fields
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::LoginSuccess {
            login,
            tenant_code,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                login = %login,
                tenant_code = ?tenant_code,
                ip_address = ?ip_address,
                "Login successful"
            );
        }
        AuditEvent::LoginPending {
            login,
            outcome,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                login = %login,
                outcome = %outcome,
                ip_address = ?ip_address,
                "Login pending"
            );
        }
        AuditEvent::LoginFailure {
            login,
            reason,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                login = %login,
                reason = %reason,
                ip_address = ?ip_address,
                "Login failed"
            );
        }
        AuditEvent::PasswordSet { login, ip_address } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                login = %login,
                ip_address = ?ip_address,
                "Password set"
            );
        }
        AuditEvent::InvalidToken {
            ip_address, reason, ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                ip_address = ?ip_address,
                reason = %reason,
                "Invalid token"
            );
        }
        AuditEvent::PurchaseOrderCreated {
            login,
            tenant_code,
            sl_no,
            po_no,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                login = %login,
                tenant_code = %tenant_code,
                sl_no = %sl_no,
                po_no = %po_no,
                "Purchase order created"
            );
        }
    }
}

/// Extract IP address from request headers
///
/// Checks X-Forwarded-For, then X-Real-IP.
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            // First entry is the client
            if let Some(first_ip) = xff_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
