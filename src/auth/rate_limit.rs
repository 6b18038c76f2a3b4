//! Sliding-window rate limiting for OTP issuance.
//!
//! Each key keeps the timestamps of its admitted events. A check prunes the
//! entries that fell out of the trailing window and admits the new event only
//! while fewer than `limit` remain. Rejected attempts are not recorded, so a
//! caller hammering a throttled key does not extend its own lockout.
//!
//! Pruning is lazy (on the next check for the same key); there is no
//! background sweep.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

use super::{clock::Clock, error::AuthError};

pub const DEFAULT_RATE_LIMIT: usize = 3;
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(10 * 60);

pub trait RateLimiter: Send + Sync {
    /// Admit or reject one event for `key`.
    ///
    /// # Errors
    /// Returns `AuthError::RateLimitExceeded` when `key` already has `limit`
    /// admitted events inside the window.
    fn allow(&self, key: &str) -> Result<(), AuthError>;
}

pub struct MemoryRateLimiter {
    limit: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
    hits: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl MemoryRateLimiter {
    #[must_use]
    pub fn new(limit: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit,
            window,
            clock,
            hits: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    fn expired(&self, now: DateTime<Utc>, at: DateTime<Utc>) -> bool {
        // A timestamp ahead of `now` (clock stepped back) is kept.
        (now - at).to_std().is_ok_and(|age| age > self.window)
    }
}

impl RateLimiter for MemoryRateLimiter {
    fn allow(&self, key: &str) -> Result<(), AuthError> {
        let now = self.clock.now();
        let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);
        let history = hits.entry(key.to_string()).or_default();

        while history.front().is_some_and(|at| self.expired(now, *at)) {
            history.pop_front();
        }

        if history.len() >= self.limit {
            debug!(key, admitted = history.len(), "rate limit reached");
            return Err(AuthError::RateLimitExceeded {
                limit: self.limit,
                window: self.window,
            });
        }

        history.push_back(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use chrono::Duration as ChronoDuration;
    use std::thread;

    fn limiter(limit: usize, clock: &Arc<ManualClock>) -> MemoryRateLimiter {
        MemoryRateLimiter::new(limit, DEFAULT_RATE_WINDOW, clock.clone())
    }

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(3, &clock);

        for _ in 0..3 {
            assert!(limiter.allow("otp:+1555").is_ok());
            clock.advance(ChronoDuration::minutes(1));
        }

        // t = 3m
        assert!(matches!(
            limiter.allow("otp:+1555"),
            Err(AuthError::RateLimitExceeded { limit: 3, .. })
        ));

        // t = 11m: the event at t = 0 aged out
        clock.advance(ChronoDuration::minutes(8));
        assert!(limiter.allow("otp:+1555").is_ok());

        // the t = 1m and t = 2m events are still in the window
        assert!(limiter.allow("otp:+1555").is_err());
    }

    #[test]
    fn rejected_attempts_are_not_recorded() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(1, &clock);

        assert!(limiter.allow("k").is_ok());
        for _ in 0..5 {
            clock.advance(ChronoDuration::minutes(2));
            assert!(limiter.allow("k").is_err());
        }

        // 10m since the only admitted event, still inside the window edge
        assert!(limiter.allow("k").is_err());
        clock.advance(ChronoDuration::seconds(1));
        assert!(limiter.allow("k").is_ok());
    }

    #[test]
    fn keys_are_independent() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(1, &clock);

        assert!(limiter.allow("otp:+1000").is_ok());
        assert!(limiter.allow("otp:+2000").is_ok());
        assert!(limiter.allow("otp:+1000").is_err());
    }

    #[test]
    fn zero_limit_rejects_everything() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(0, &clock);
        assert!(limiter.allow("k").is_err());
    }

    #[test]
    fn clock_stepping_back_keeps_history() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(1, &clock);

        assert!(limiter.allow("k").is_ok());
        clock.advance(ChronoDuration::minutes(-30));
        assert!(limiter.allow("k").is_err());
    }

    #[test]
    fn concurrent_callers_admit_exactly_limit() {
        let clock = Arc::new(ManualClock::default());
        let limiter = Arc::new(limiter(3, &clock));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || limiter.allow("otp:+1555").is_ok())
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or(false))
            .filter(|ok| *ok)
            .count();

        assert_eq!(admitted, 3);
    }
}
