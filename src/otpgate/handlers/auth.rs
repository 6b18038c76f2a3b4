//! Phone login endpoints.
//!
//! Flow Overview:
//! 1) `request-otp` validates the phone, applies the per-phone rate limit, and
//!    stores a fresh code. Delivery is out of band; the code is never returned.
//! 2) `verify` checks the code, creates the user on first login, and returns a
//!    signed session token.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, info, instrument};

use super::{
    types::{ErrorResponse, LoginResponse, MessageResponse, RequestOtpRequest, VerifyOtpRequest},
    valid_phone,
};
use crate::auth::{error_response, AuthError, AuthState};

#[utoipa::path(
    post,
    path = "/api/v1/auth/request-otp",
    request_body = RequestOtpRequest,
    responses(
        (status = 200, description = "Code generated and stored", body = MessageResponse),
        (status = 400, description = "Missing payload or invalid phone", body = ErrorResponse),
        (status = 429, description = "Too many codes for this phone", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn request_otp(
    state: Extension<AuthState>,
    payload: Option<Json<RequestOtpRequest>>,
) -> Response {
    let request: RequestOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error_response(StatusCode::BAD_REQUEST, "invalid request body"),
    };

    let phone = request.phone.trim();
    if !valid_phone(phone) {
        return error_response(StatusCode::BAD_REQUEST, "invalid phone number");
    }

    match state.otp.generate(phone) {
        Ok(code) => {
            if state.log_otp() {
                info!(phone, otp = %code, "Issued otp");
            } else {
                debug!("Issued otp");
            }
            (
                StatusCode::OK,
                Json(MessageResponse {
                    message: "otp generated".to_string(),
                }),
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/verify",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Code accepted, session token issued", body = LoginResponse),
        (status = 400, description = "Missing payload or bad code", body = ErrorResponse),
        (status = 500, description = "Token signing failed", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn verify(
    state: Extension<AuthState>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> Response {
    let request: VerifyOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error_response(StatusCode::BAD_REQUEST, "invalid request body"),
    };

    let phone = request.phone.trim();
    let otp = request.otp.trim();
    if !valid_phone(phone) || otp.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "invalid request body");
    }

    if !state.otp.verify_code(phone, otp) {
        return AuthError::InvalidOtp.into_response();
    }

    let user = state.users.upsert_by_phone(phone);

    match state.authority.issue_token(&user.id.to_string()) {
        Ok(token) => {
            debug!(user_id = %user.id, "Issued session token");
            (StatusCode::OK, Json(LoginResponse { token, user })).into_response()
        }
        Err(err) => {
            AuthError::Internal(format!("failed to sign session token: {err}")).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthConfig, ManualClock};
    use axum::body::to_bytes;
    use secrecy::SecretString;
    use std::sync::Arc;

    fn state() -> AuthState {
        let config = AuthConfig::new(SecretString::from("handler-test-secret".to_string()));
        AuthState::with_clock(&config, Arc::new(ManualClock::default()))
    }

    async fn body_json(response: Response) -> anyhow::Result<serde_json::Value> {
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    #[tokio::test]
    async fn request_otp_rejects_missing_payload() -> anyhow::Result<()> {
        let response = request_otp(Extension(state()), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await?["error"], "invalid request body");
        Ok(())
    }

    #[tokio::test]
    async fn request_otp_rejects_invalid_phone() -> anyhow::Result<()> {
        let payload = Json(RequestOtpRequest {
            phone: "not a phone".to_string(),
        });
        let response = request_otp(Extension(state()), Some(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await?["error"], "invalid phone number");
        Ok(())
    }

    #[tokio::test]
    async fn request_otp_does_not_return_code() -> anyhow::Result<()> {
        let payload = Json(RequestOtpRequest {
            phone: " +1555 ".to_string(),
        });
        let response = request_otp(Extension(state()), Some(payload)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await?;
        assert_eq!(body, serde_json::json!({ "message": "otp generated" }));
        Ok(())
    }

    #[tokio::test]
    async fn verify_rejects_unknown_code_generically() -> anyhow::Result<()> {
        let payload = Json(VerifyOtpRequest {
            phone: "+1555".to_string(),
            otp: "123456".to_string(),
        });
        let response = verify(Extension(state()), Some(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await?["error"], "invalid or expired otp");
        Ok(())
    }

    #[tokio::test]
    async fn verify_rejects_empty_otp() -> anyhow::Result<()> {
        let payload = Json(VerifyOtpRequest {
            phone: "+1555".to_string(),
            otp: "   ".to_string(),
        });
        let response = verify(Extension(state()), Some(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_issues_token_for_subject() -> anyhow::Result<()> {
        let state = state();
        let code = state.otp.generate("+1555").map_err(|e| anyhow::anyhow!(e))?;

        let payload = Json(VerifyOtpRequest {
            phone: "+1555".to_string(),
            otp: code,
        });
        let response = verify(Extension(state.clone()), Some(payload)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await?;
        let token = body["token"].as_str().unwrap_or_default();
        let claims = state.authority.verify_token(token)?;
        assert_eq!(body["user"]["id"], claims.sub);
        assert_eq!(body["user"]["phone"], "+1555");
        Ok(())
    }
}
