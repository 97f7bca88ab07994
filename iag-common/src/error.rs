//! Error taxonomy for IAG services
//!
//! Every failure surfaced over HTTP carries a stable machine-readable code
//! in the body: `{"error": "<code>", "detail": "<text>"}`. Upstream bodies
//! are never echoed outside debug surfaces and tokens never appear in
//! error output.

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

/// Result type for IAG operations
pub type Result<T> = std::result::Result<T, IagError>;

/// IAG-wide errors, mapped 1:1 onto stable wire codes.
#[derive(Debug, Error)]
pub enum IagError {
    /// A required parameter is missing or malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The policy engine refused the requested scopes
    #[error("denied by policy: {0}")]
    DeniedByPolicy(String),

    /// No ready session covers the required scope (or upstream revoked it)
    #[error("no ready session for the required scope")]
    LoginRequired,

    /// A per-request obligation was breached
    #[error("obligation violation: {0}")]
    ObligationViolation(String),

    /// The session's obligation TTL elapsed; re-authorization required
    #[error("session obligations expired; re-authorization required")]
    ObligationTtlExpired,

    /// Authorization code unknown, consumed, or bound to another client
    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    /// PKCE verifier did not match the stored challenge
    #[error("PKCE verification failed")]
    BadPkce,

    /// Token audience does not match the expected resource
    #[error("audience mismatch: {0}")]
    BadAudience(String),

    /// Token is valid but lacks the scope the tool requires
    #[error("insufficient scope: {0}")]
    InsufficientScope(String),

    /// Upstream TCP/HTTP failure
    #[error("upstream request failed: {0}")]
    BadGateway(String),

    /// The AS introspection endpoint answered non-2xx
    #[error("introspection failed: {0}")]
    IntrospectionFailed(String),

    /// RS discovery failed on both the probe and the fallback metadata URL
    #[error("session start failed: {0}")]
    StartFailed(String),

    /// Signed state envelope rejected on callback
    #[error("state rejected: {0}")]
    BadState(String),

    /// Anything that should not happen
    #[error("internal error: {0}")]
    Internal(String),
}

impl IagError {
    /// Stable machine-readable code for the wire.
    pub fn code(&self) -> &'static str {
        match self {
            IagError::InvalidRequest(_) => "invalid_request",
            IagError::DeniedByPolicy(_) => "denied_by_policy",
            IagError::LoginRequired => "login_required",
            IagError::ObligationViolation(_) => "obligation_violation",
            IagError::ObligationTtlExpired => "session_obligation_ttl_expired",
            IagError::InvalidGrant(_) => "invalid_grant",
            IagError::BadPkce => "bad_pkce",
            IagError::BadAudience(_) => "bad_audience",
            IagError::InsufficientScope(_) => "insufficient_scope",
            IagError::BadGateway(_) => "bad_gateway",
            IagError::IntrospectionFailed(_) => "introspection_failed",
            IagError::StartFailed(_) => "start_failed",
            IagError::BadState(_) => "bad_state",
            IagError::Internal(_) => "internal_error",
        }
    }

    /// Human-readable detail, without the code prefix.
    pub fn detail(&self) -> String {
        match self {
            IagError::InvalidRequest(d)
            | IagError::DeniedByPolicy(d)
            | IagError::ObligationViolation(d)
            | IagError::InvalidGrant(d)
            | IagError::BadAudience(d)
            | IagError::InsufficientScope(d)
            | IagError::BadGateway(d)
            | IagError::IntrospectionFailed(d)
            | IagError::StartFailed(d)
            | IagError::BadState(d)
            | IagError::Internal(d) => d.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            IagError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            IagError::DeniedByPolicy(_) => StatusCode::FORBIDDEN,
            IagError::LoginRequired => StatusCode::UNAUTHORIZED,
            IagError::ObligationViolation(_) => StatusCode::FORBIDDEN,
            IagError::ObligationTtlExpired => StatusCode::UNAUTHORIZED,
            IagError::InvalidGrant(_) => StatusCode::BAD_REQUEST,
            IagError::BadPkce => StatusCode::BAD_REQUEST,
            IagError::BadAudience(_) => StatusCode::UNAUTHORIZED,
            IagError::InsufficientScope(_) => StatusCode::FORBIDDEN,
            IagError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            IagError::IntrospectionFailed(_) => StatusCode::UNAUTHORIZED,
            IagError::StartFailed(_) => StatusCode::BAD_GATEWAY,
            IagError::BadState(_) => StatusCode::BAD_REQUEST,
            IagError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for IagError {
    fn from(err: reqwest::Error) -> Self {
        IagError::BadGateway(err.to_string())
    }
}

impl From<serde_json::Error> for IagError {
    fn from(err: serde_json::Error) -> Self {
        IagError::Internal(format!("JSON error: {err}"))
    }
}

impl actix_web::error::ResponseError for IagError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status()).json(serde_json::json!({
            "error": self.code(),
            "detail": self.detail(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(IagError::LoginRequired.code(), "login_required");
        assert_eq!(
            IagError::ObligationTtlExpired.code(),
            "session_obligation_ttl_expired"
        );
        assert_eq!(IagError::BadPkce.code(), "bad_pkce");
        assert_eq!(
            IagError::ObligationViolation("amount exceeds max".into()).code(),
            "obligation_violation"
        );
    }

    #[test]
    fn status_mapping() {
        assert_eq!(IagError::LoginRequired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            IagError::DeniedByPolicy("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            IagError::InvalidGrant("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IagError::BadGateway("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            IagError::BadAudience("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn detail_strips_code_prefix() {
        let err = IagError::ObligationViolation("merchant not allowed".into());
        assert_eq!(err.detail(), "merchant not allowed");
    }
}
