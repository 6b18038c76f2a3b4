use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

/// Failures surfaced to HTTP callers.
///
/// Messages are generic: callers cannot tell an expired code from
/// a wrong one, or a registered phone from an unknown one.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("rate limit exceeded: max {limit} in {}s", .window.as_secs())]
    RateLimitExceeded { limit: usize, window: Duration },
    #[error("invalid or expired otp")]
    InvalidOtp,
    #[error("unauthorized")]
    Unauthenticated,
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidOtp => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded { .. } => "rate limit exceeded",
            Self::InvalidOtp => "invalid or expired otp",
            Self::Unauthenticated => "unauthorized",
            Self::Internal(_) => "internal server error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            error!("Internal error: {detail}");
        }
        let body = Json(json!({ "error": self.public_message() }));
        (self.status(), body).into_response()
    }
}

/// JSON error body for transport-level rejections (malformed input, not found).
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
