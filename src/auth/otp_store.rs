//! In-memory OTP records keyed by phone number.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::debug;

use super::clock::Clock;

pub trait OtpStore: Send + Sync {
    /// Replace whatever record `identifier` had with `code`, valid for `ttl`.
    fn save(&self, identifier: &str, code: &str, ttl: Duration);

    /// `true` only when a live record exists and its code matches exactly.
    fn verify(&self, identifier: &str, code: &str) -> bool;
}

#[derive(Clone, Debug)]
struct OtpRecord {
    code: String,
    expires_at: DateTime<Utc>,
}

pub struct MemoryOtpStore {
    clock: Arc<dyn Clock>,
    single_use: bool,
    records: Mutex<HashMap<String, OtpRecord>>,
}

impl MemoryOtpStore {
    /// Single-use store: a code is removed as soon as it verifies.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            single_use: true,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// With `false`, a verified code stays valid until it expires or is
    /// superseded, so it can be replayed within its TTL.
    #[must_use]
    pub fn with_single_use(mut self, single_use: bool) -> Self {
        self.single_use = single_use;
        self
    }

    #[must_use]
    pub fn single_use(&self) -> bool {
        self.single_use
    }
}

impl OtpStore for MemoryOtpStore {
    fn save(&self, identifier: &str, code: &str, ttl: Duration) {
        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert(
            identifier.to_string(),
            OtpRecord {
                code: code.to_string(),
                expires_at,
            },
        );
    }

    fn verify(&self, identifier: &str, code: &str) -> bool {
        let now = self.clock.now();
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(record) = records.get(identifier) else {
            debug!(identifier, "no otp issued");
            return false;
        };

        if now > record.expires_at {
            debug!(identifier, "otp expired");
            records.remove(identifier);
            return false;
        }

        let matches: bool = record.code.as_bytes().ct_eq(code.as_bytes()).into();
        if !matches {
            debug!(identifier, "otp mismatch");
            return false;
        }

        if self.single_use {
            records.remove(identifier);
        }
        true
    }
}
