//! # otpgate (phone OTP login)
//!
//! `otpgate` signs users in with a one-time passcode sent to their phone and
//! hands back a signed session token for the protected API.
//!
//! ## Login Flow
//!
//! 1. `POST /api/v1/auth/request-otp` stores a fresh 6-digit code for the phone,
//!    subject to a per-phone sliding-window rate limit. Delivery of the code is
//!    out of band.
//! 2. `POST /api/v1/auth/verify` checks the code. On success the user is created
//!    on first login and an HS256 session token is returned.
//! 3. Protected routes require `Authorization: Bearer <token>`.
//!
//! ## State
//!
//! Everything lives in process memory and is lost on restart. Services are
//! built once at startup and shared through axum extensions.

pub mod auth;
pub mod cli;
pub mod otpgate;
pub mod users;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
