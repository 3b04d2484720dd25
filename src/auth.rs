//! Placeholder auth endpoint.
//!
//! Every request succeeds. No password or IP check happens here; this exists
//! only so the page's "am I logged in" check gets a positive answer.

use axum::{
    http::{header, HeaderValue},
    response::IntoResponse,
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::observability::log_auth_stub;

pub const AUTH_STUB_MESSAGE: &str = "authentication not enforced";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStubResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
    pub deployment: String,
}

impl AuthStubResponse {
    pub fn now() -> Self {
        Self {
            success: true,
            message: AUTH_STUB_MESSAGE.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            deployment: concat!("sigdash-", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

pub(crate) async fn auth_stub() -> impl IntoResponse {
    log_auth_stub();
    (
        [(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        )],
        Json(AuthStubResponse::now()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_always_reports_success_with_iso_timestamp() {
        let body = AuthStubResponse::now();
        assert!(body.success);
        assert_eq!(body.message, AUTH_STUB_MESSAGE);
        assert!(body.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&body.timestamp).is_ok());
        assert!(body.deployment.starts_with("sigdash-"));
    }
}
