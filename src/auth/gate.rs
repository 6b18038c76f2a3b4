//! Bearer-token guard for protected routes.
//!
//! Flow Overview: read `Authorization: Bearer <token>`, verify it with the
//! credential authority, and hand the token subject to downstream handlers as
//! a [`Principal`]. Every failure is a plain 401; the reason only reaches the
//! debug log.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::{error::AuthError, token::CredentialAuthority};

const BEARER_PREFIX: &str = "bearer ";

/// Authenticated caller, taken from the token subject.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
}

/// Resolve the request headers into a principal.
///
/// # Errors
/// Returns `AuthError::Unauthenticated` for a missing header, a scheme other
/// than `Bearer`, an empty token, or a token that fails verification.
pub fn authenticate(
    headers: &HeaderMap,
    authority: &CredentialAuthority,
) -> Result<Principal, AuthError> {
    let Some(token) = extract_bearer_token(headers) else {
        debug!("missing bearer token");
        return Err(AuthError::Unauthenticated);
    };

    let claims = authority.verify_token(token).map_err(|err| {
        debug!("rejected session token: {err}");
        AuthError::Unauthenticated
    })?;

    Ok(Principal {
        user_id: claims.sub,
    })
}

/// axum middleware wrapping [`authenticate`].
pub async fn require_session(
    State(authority): State<Arc<CredentialAuthority>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(request.headers(), &authority) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let scheme = value.get(..BEARER_PREFIX.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = value[BEARER_PREFIX.len()..].trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
