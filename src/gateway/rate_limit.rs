//! Fixed-window rate limiting per client IP
//!
//! Each IP gets a counter that resets 60 seconds after the first request of
//! its window. A burst at the end of one window followed by another at the
//! start of the next can exceed the nominal rate briefly.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Length of a rate-limit window
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Per-IP window state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    /// Requests counted in the current window
    pub count: u32,
    /// When the window rolls over
    pub window_reset_at: Instant,
}

/// Fixed-window limiter keyed by client IP
#[derive(Debug)]
pub struct IpRateLimiter {
    records: DashMap<String, RateLimitRecord>,
    window: Duration,
}

impl IpRateLimiter {
    /// Create a limiter with the standard 60 second window
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(RATE_LIMIT_WINDOW)
    }

    /// Create a limiter with a custom window
    #[must_use]
    pub fn with_window(window: Duration) -> Self {
        Self {
            records: DashMap::new(),
            window,
        }
    }

    /// Count a request from `ip` against `limit`.
    ///
    /// Returns `Err(retry_after)` when the window is exhausted.
    pub fn check(&self, ip: &str, limit: u32) -> Result<(), Duration> {
        self.check_at(ip, limit, Instant::now())
    }

    /// [`check`](Self::check) against an explicit clock reading
    pub fn check_at(&self, ip: &str, limit: u32, now: Instant) -> Result<(), Duration> {
        let fresh = RateLimitRecord {
            count: 1,
            window_reset_at: now + self.window,
        };

        // The entry holds the shard lock, so check-and-increment is atomic per IP
        match self.records.entry(ip.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                Ok(())
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                if now >= record.window_reset_at {
                    *record = fresh;
                    Ok(())
                } else if record.count >= limit {
                    Err(record.window_reset_at - now)
                } else {
                    record.count += 1;
                    Ok(())
                }
            }
        }
    }

    /// Evict records whose window has already rolled over. Returns how many.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| now < record.window_reset_at);
        before.saturating_sub(self.records.len())
    }

    /// Current record for `ip`
    #[must_use]
    pub fn record(&self, ip: &str) -> Option<RateLimitRecord> {
        self.records.get(ip).map(|r| *r)
    }

    /// Number of tracked IPs
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no IP is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for IpRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nth_plus_one_request_is_rejected() {
        let limiter = IpRateLimiter::new();
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("10.0.0.1", 3, now).is_ok());
        }
        let retry_after = limiter.check_at("10.0.0.1", 3, now).unwrap_err();
        assert_eq!(retry_after, RATE_LIMIT_WINDOW);
        assert_eq!(limiter.record("10.0.0.1").unwrap().count, 3);
    }

    #[test]
    fn window_rollover_allows_again() {
        let limiter = IpRateLimiter::new();
        let now = Instant::now();

        assert!(limiter.check_at("10.0.0.1", 1, now).is_ok());
        assert!(limiter.check_at("10.0.0.1", 1, now + Duration::from_secs(59)).is_err());
        assert!(limiter.check_at("10.0.0.1", 1, now + RATE_LIMIT_WINDOW).is_ok());
        assert_eq!(limiter.record("10.0.0.1").unwrap().count, 1);
    }

    #[test]
    fn ips_are_independent() {
        let limiter = IpRateLimiter::new();
        let now = Instant::now();

        assert!(limiter.check_at("10.0.0.1", 1, now).is_ok());
        assert!(limiter.check_at("10.0.0.1", 1, now).is_err());
        assert!(limiter.check_at("10.0.0.2", 1, now).is_ok());
    }

    #[test]
    fn sweep_evicts_only_expired() {
        let limiter = IpRateLimiter::new();
        let now = Instant::now();

        limiter.check_at("old", 10, now).unwrap();
        limiter.check_at("new", 10, now + Duration::from_secs(30)).unwrap();

        let removed = limiter.sweep_expired(now + Duration::from_secs(61));
        assert_eq!(removed, 1);
        assert!(limiter.record("old").is_none());
        assert!(limiter.record("new").is_some());
    }
}
