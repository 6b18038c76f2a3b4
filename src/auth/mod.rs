//! Short-lived credential lifecycle: OTP issuance, verification, and session tokens.
//!
//! ## OTP Issuance
//!
//! Codes are 6 digits drawn from the OS CSPRNG and live for 2 minutes by
//! default. Only the most recent code for a phone number is valid. A code is
//! single-use: it is removed from the store on the first successful check.
//!
//! ## Rate Limiting
//!
//! Issuance is limited per phone number with a sliding window (3 codes per
//! 10 minutes by default). Rejected requests are not counted.
//!
//! ## Session Tokens
//!
//! Successful verification yields an HS256 JWT (`sub`, `iat`, `exp`) valid for
//! 24 hours by default. Verification pins the algorithm and checks expiry
//! against the service clock. Tokens are stateless; there is no revocation.

pub mod clock;
mod error;
pub mod gate;
pub mod otp;
pub mod otp_store;
pub mod rate_limit;
mod state;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{error_response, AuthError};
pub use gate::{require_session, Principal};
pub use otp::OtpIssuer;
pub use otp_store::{MemoryOtpStore, OtpStore};
pub use rate_limit::{MemoryRateLimiter, RateLimiter};
pub use state::{AuthConfig, AuthState};
pub use token::{CredentialAuthority, SessionClaims, TokenError};
