//! Per-client sliding-window rate limiting.
//!
//! # Algorithm
//!
//! Each client key owns one [`RateLimitEntry`] holding a request count and
//! the instant its window started. On every check:
//!
//! 1. Entries whose window started more than `window` ago are swept.
//! 2. The client's entry is looked up:
//!    - absent: created with `count = 1`, request admitted
//!    - `count < limit`: incremented, `window_start` moved to now, admitted
//!    - `count >= limit`: rejected, entry left untouched
//!
//! ```text
//!  ABSENT ──first request──▶ COUNTING (1..limit-1) ──limit reached──▶ LIMITED
//!    ▲                                                                  │
//!    └──────────────── swept once now - window_start > window ──────────┘
//! ```
//!
//! Because `window_start` moves forward on every admitted request, a client
//! regains capacity one full window after its *last admitted* request.
//!
//! # Cost
//!
//! The sweep walks the whole table on every check, so each request costs
//! O(tracked clients). That is fine for a small site. The optional
//! background sweeper in [`crate::state`] only bounds memory between
//! requests; it does not remove the per-request walk.

mod clock;
mod store;

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{InMemoryStore, RateLimitStore};

use crate::metrics;

/// Default number of requests admitted per client per window.
pub const DEFAULT_RATE_LIMIT: u32 = 10;

/// Default window length (60 seconds).
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(60_000);

/// Counter state for one client key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Requests admitted in the current window.
    pub count: u32,
    /// Start of the current window, refreshed on every admitted request.
    pub window_start: Instant,
}

impl RateLimitEntry {
    /// A fresh entry for a client's first request.
    pub fn new(now: Instant) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }

    /// Whether the window started strictly more than `window` before `now`.
    #[inline]
    pub fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) > window
    }

    /// Time left until this entry expires.
    #[inline]
    pub fn remaining(&self, now: Instant, window: Duration) -> Duration {
        window.saturating_sub(now.saturating_duration_since(self.window_start))
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Request admitted; `count` is the client's total in this window.
    Allowed { count: u32 },
    /// Request rejected; the client regains capacity after `retry_after`.
    Limited { retry_after: Duration },
}

impl Admission {
    /// Whether the request was admitted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

/// Invalid limiter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LimiterError {
    #[error("rate limit must be greater than 0; disable limiting instead")]
    ZeroLimit,

    #[error("rate limit window must be greater than 0")]
    ZeroWindow,
}

/// Sliding-window limiter over an injected store and clock.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use edge_gate::limiter::{InMemoryStore, ManualClock, SlidingWindowLimiter};
///
/// let clock = ManualClock::new();
/// let limiter = SlidingWindowLimiter::with_parts(
///     2,
///     Duration::from_secs(60),
///     Arc::new(InMemoryStore::new()),
///     Arc::new(clock.clone()),
/// )?;
///
/// assert!(limiter.check("198.51.100.7").is_allowed());
/// assert!(limiter.check("198.51.100.7").is_allowed());
/// assert!(!limiter.check("198.51.100.7").is_allowed());
///
/// clock.advance(Duration::from_secs(61));
/// assert!(limiter.check("198.51.100.7").is_allowed());
/// # Ok::<(), edge_gate::limiter::LimiterError>(())
/// ```
pub struct SlidingWindowLimiter {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
    limit: u32,
    window: Duration,
}

impl SlidingWindowLimiter {
    /// Create a limiter with an in-memory store and the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError`] if `limit` or `window` is zero.
    pub fn new(limit: u32, window: Duration) -> Result<Self, LimiterError> {
        Self::with_parts(
            limit,
            window,
            Arc::new(InMemoryStore::new()),
            Arc::new(SystemClock),
        )
    }

    /// Create a limiter over an explicit store and clock.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError`] if `limit` or `window` is zero.
    pub fn with_parts(
        limit: u32,
        window: Duration,
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LimiterError> {
        if limit == 0 {
            return Err(LimiterError::ZeroLimit);
        }
        if window.is_zero() {
            return Err(LimiterError::ZeroWindow);
        }

        Ok(Self {
            store,
            clock,
            limit,
            window,
        })
    }

    /// Sweep expired entries, then check and record a request for `key`.
    pub fn check(&self, key: &str) -> Admission {
        let now = self.clock.now();
        self.sweep_at(now);

        let admission = self
            .store
            .check_and_record(key, now, self.window, self.limit);
        metrics::set_tracked_clients(self.store.len());
        admission
    }

    /// Remove expired entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(self.clock.now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let removed = self.store.sweep_expired(now, self.window);
        if removed > 0 {
            debug!(removed, "Swept expired rate limit entries");
            metrics::record_swept_entries(removed as u64);
        }
        removed
    }

    /// Current entry for `key`, if tracked.
    pub fn entry(&self, key: &str) -> Option<RateLimitEntry> {
        self.store.get(key)
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.store.len()
    }

    /// Requests admitted per window.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl std::fmt::Debug for SlidingWindowLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlidingWindowLimiter")
            .field("limit", &self.limit)
            .field("window", &self.window)
            .field("tracked_clients", &self.store.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn limiter_with_clock() -> (SlidingWindowLimiter, ManualClock) {
        let clock = ManualClock::new();
        let limiter = SlidingWindowLimiter::with_parts(
            DEFAULT_RATE_LIMIT,
            DEFAULT_WINDOW,
            Arc::new(InMemoryStore::new()),
            Arc::new(clock.clone()),
        )
        .unwrap();
        (limiter, clock)
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let result = SlidingWindowLimiter::new(0, DEFAULT_WINDOW);
        assert!(matches!(result, Err(LimiterError::ZeroLimit)));
    }

    #[test]
    fn test_zero_window_is_rejected() {
        let result = SlidingWindowLimiter::new(10, Duration::ZERO);
        assert!(matches!(result, Err(LimiterError::ZeroWindow)));
    }

    #[test]
    fn test_tenth_request_admitted_eleventh_rejected() {
        let (limiter, _clock) = limiter_with_clock();

        for expected in 1..=10 {
            assert_eq!(
                limiter.check("203.0.113.5"),
                Admission::Allowed { count: expected }
            );
        }

        assert!(matches!(
            limiter.check("203.0.113.5"),
            Admission::Limited { .. }
        ));
        assert_eq!(limiter.entry("203.0.113.5").unwrap().count, 10);
    }

    #[test]
    fn test_limited_client_readmitted_after_window() {
        let (limiter, clock) = limiter_with_clock();
        for _ in 0..10 {
            limiter.check("203.0.113.5");
        }
        assert!(!limiter.check("203.0.113.5").is_allowed());

        clock.advance(DEFAULT_WINDOW + Duration::from_millis(1));

        assert_eq!(limiter.check("203.0.113.5"), Admission::Allowed { count: 1 });
    }

    #[test]
    fn test_still_limited_exactly_at_window_edge() {
        let (limiter, clock) = limiter_with_clock();
        for _ in 0..10 {
            limiter.check("203.0.113.5");
        }

        clock.advance(DEFAULT_WINDOW);

        assert!(!limiter.check("203.0.113.5").is_allowed());
    }

    #[test]
    fn test_window_measured_from_last_admitted_request() {
        let (limiter, clock) = limiter_with_clock();
        limiter.check("a");
        clock.advance(Duration::from_secs(50));
        for _ in 0..9 {
            limiter.check("a");
        }

        // 61s after the first request, but only 11s after the last admitted one.
        clock.advance(Duration::from_secs(11));
        assert!(!limiter.check("a").is_allowed());
    }

    #[test]
    fn test_retry_after_counts_down() {
        let (limiter, clock) = limiter_with_clock();
        for _ in 0..10 {
            limiter.check("a");
        }
        clock.advance(Duration::from_secs(20));

        assert_eq!(
            limiter.check("a"),
            Admission::Limited {
                retry_after: Duration::from_secs(40)
            }
        );
    }

    #[test]
    fn test_clients_are_independent() {
        let (limiter, _clock) = limiter_with_clock();
        for _ in 0..10 {
            limiter.check("a");
        }

        assert!(!limiter.check("a").is_allowed());
        assert!(limiter.check("b").is_allowed());
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_check_sweeps_other_expired_clients() {
        let (limiter, clock) = limiter_with_clock();
        limiter.check("idle");
        clock.advance(Duration::from_secs(61));

        limiter.check("active");

        assert!(limiter.entry("idle").is_none());
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_explicit_sweep() {
        let (limiter, clock) = limiter_with_clock();
        limiter.check("a");
        limiter.check("b");
        clock.advance(Duration::from_secs(61));

        assert_eq!(limiter.sweep(), 2);
        assert_eq!(limiter.tracked_clients(), 0);
    }
}
