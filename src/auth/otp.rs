//! OTP issuance and verification.
//!
//! Flow Overview:
//! 1) Throttle the phone number through the rate limiter (`otp:<phone>` key).
//! 2) Draw a 6-digit code from the OS CSPRNG.
//! 3) Store it with the configured TTL, replacing any previous code.
//!
//! Delivery is the caller's job. The code is never part of an HTTP response.

use rand::{rngs::OsRng, Rng};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{error::AuthError, otp_store::OtpStore, rate_limit::RateLimiter};

pub const DEFAULT_OTP_TTL: Duration = Duration::from_secs(2 * 60);
pub const OTP_DIGITS: usize = 6;
const OTP_SPACE: u32 = 1_000_000;

pub struct OtpIssuer {
    store: Arc<dyn OtpStore>,
    rate_limiter: Arc<dyn RateLimiter>,
    ttl: Duration,
}

impl OtpIssuer {
    #[must_use]
    pub fn new(
        store: Arc<dyn OtpStore>,
        rate_limiter: Arc<dyn RateLimiter>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            rate_limiter,
            ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a fresh code for `phone`.
    ///
    /// # Errors
    /// Returns `AuthError::RateLimitExceeded` when the phone has used up its
    /// issuance allowance; the store is left untouched in that case.
    #[instrument(skip(self))]
    pub fn generate(&self, phone: &str) -> Result<String, AuthError> {
        self.rate_limiter.allow(&rate_limit_key(phone))?;

        let code = generate_code();
        self.store.save(phone, &code, self.ttl);
        debug!("otp issued");

        Ok(code)
    }

    /// Expired, mismatched and never-issued codes all read `false`.
    #[instrument(skip(self, code))]
    pub fn verify_code(&self, phone: &str, code: &str) -> bool {
        self.store.verify(phone, code)
    }
}

fn rate_limit_key(phone: &str) -> String {
    format!("otp:{phone}")
}

/// Uniform over `000000..=999999`.
#[must_use]
pub fn generate_code() -> String {
    let value = OsRng.gen_range(0..OTP_SPACE);
    format!("{value:0width$}", width = OTP_DIGITS)
}
