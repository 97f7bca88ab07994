//! Resource-server errors
//!
//! 401 responses carry the `WWW-Authenticate` challenge that points
//! clients at the protected-resource metadata; the challenge string is
//! built where the configuration is at hand and travels inside the error.

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RsError>;

#[derive(Debug, Error)]
pub enum RsError {
    /// Token missing, unverifiable, inactive, or aimed at someone else
    #[error("{detail}")]
    Unauthorized {
        /// `invalid_token`, `bad_audience` or `introspection_failed`
        code: &'static str,
        detail: String,

        /// Full `WWW-Authenticate` header value
        challenge: String,
    },

    /// Token is fine but lacks the scope this tool requires
    #[error("scope {required} is required")]
    InsufficientScope { required: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl actix_web::error::ResponseError for RsError {
    fn status_code(&self) -> StatusCode {
        match self {
            RsError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            RsError::InsufficientScope { .. } => StatusCode::FORBIDDEN,
            RsError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            RsError::Unauthorized {
                code,
                detail,
                challenge,
            } => HttpResponse::Unauthorized()
                .insert_header(("WWW-Authenticate", challenge.as_str()))
                .json(serde_json::json!({ "error": code, "detail": detail })),
            RsError::InsufficientScope { required } => {
                HttpResponse::Forbidden().json(serde_json::json!({
                    "error": "insufficient_scope",
                    "detail": format!("scope {required} is required"),
                }))
            }
            RsError::InvalidRequest(detail) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "invalid_request",
                    "detail": detail,
                }))
            }
        }
    }
}
