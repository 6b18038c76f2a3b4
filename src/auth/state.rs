//! Auth configuration and the shared service graph built from it.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;

use super::{
    clock::{Clock, SystemClock},
    otp::{OtpIssuer, DEFAULT_OTP_TTL},
    otp_store::MemoryOtpStore,
    rate_limit::{MemoryRateLimiter, DEFAULT_RATE_LIMIT, DEFAULT_RATE_WINDOW},
    token::{CredentialAuthority, DEFAULT_TOKEN_TTL},
};
use crate::users::{MemoryUserDirectory, UserDirectory};

#[derive(Clone, Debug)]
pub struct AuthConfig {
    signing_secret: SecretString,
    rate_limit: usize,
    rate_window: Duration,
    otp_ttl: Duration,
    token_ttl: Duration,
    single_use_otp: bool,
    log_otp: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(signing_secret: SecretString) -> Self {
        Self {
            signing_secret,
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_window: DEFAULT_RATE_WINDOW,
            otp_ttl: DEFAULT_OTP_TTL,
            token_ttl: DEFAULT_TOKEN_TTL,
            single_use_otp: true,
            log_otp: false,
        }
    }

    #[must_use]
    pub fn with_rate_limit(mut self, limit: usize) -> Self {
        self.rate_limit = limit;
        self
    }

    #[must_use]
    pub fn with_rate_window(mut self, window: Duration) -> Self {
        self.rate_window = window;
        self
    }

    #[must_use]
    pub fn with_otp_ttl(mut self, ttl: Duration) -> Self {
        self.otp_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_single_use_otp(mut self, single_use: bool) -> Self {
        self.single_use_otp = single_use;
        self
    }

    /// Development only: write issued codes to the log.
    #[must_use]
    pub fn with_log_otp(mut self, log_otp: bool) -> Self {
        self.log_otp = log_otp;
        self
    }

    #[must_use]
    pub fn rate_limit(&self) -> usize {
        self.rate_limit
    }

    #[must_use]
    pub fn rate_window(&self) -> Duration {
        self.rate_window
    }

    #[must_use]
    pub fn otp_ttl(&self) -> Duration {
        self.otp_ttl
    }

    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    #[must_use]
    pub fn single_use_otp(&self) -> bool {
        self.single_use_otp
    }

    #[must_use]
    pub fn log_otp(&self) -> bool {
        self.log_otp
    }

    pub(crate) fn has_signing_secret(&self) -> bool {
        !self.signing_secret.expose_secret().is_empty()
    }
}

/// Process-wide services, built once at startup and shared by reference.
#[derive(Clone)]
pub struct AuthState {
    pub otp: Arc<OtpIssuer>,
    pub authority: Arc<CredentialAuthority>,
    pub users: Arc<dyn UserDirectory>,
    log_otp: bool,
}

impl AuthState {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(
            MemoryOtpStore::new(clock.clone()).with_single_use(config.single_use_otp),
        );
        let rate_limiter = Arc::new(MemoryRateLimiter::new(
            config.rate_limit,
            config.rate_window,
            clock.clone(),
        ));
        let otp = Arc::new(OtpIssuer::new(store, rate_limiter, config.otp_ttl));
        let authority = Arc::new(CredentialAuthority::new(
            &config.signing_secret,
            config.token_ttl,
            clock.clone(),
        ));
        let users = Arc::new(MemoryUserDirectory::new(clock));

        Self {
            otp,
            authority,
            users,
            log_otp: config.log_otp,
        }
    }

    #[must_use]
    pub fn log_otp(&self) -> bool {
        self.log_otp
    }
}
