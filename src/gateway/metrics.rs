//! Process-lifetime request counters

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Request, error and connection counters.
///
/// Reset on every successful start.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Requests received
    total_requests: AtomicU64,
    /// Responses with status >= 400
    total_errors: AtomicU64,
    /// Responses with status >= 500
    total_faults: AtomicU64,
    /// Requests currently being handled
    active_connections: AtomicU64,
    /// Monotonic and wall-clock start time
    started: RwLock<Option<(Instant, DateTime<Utc>)>>,
}

impl Metrics {
    /// Create zeroed metrics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero every counter and stamp the start time
    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.total_errors.store(0, Ordering::Relaxed);
        self.total_faults.store(0, Ordering::Relaxed);
        self.active_connections.store(0, Ordering::Relaxed);
        *self.started.write() = Some((Instant::now(), Utc::now()));
    }

    /// Count an inbound request
    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a finished response by status
    pub fn record_response(&self, status: StatusCode) {
        if status.as_u16() >= 400 {
            self.total_errors.fetch_add(1, Ordering::Relaxed);
        }
        if status.is_server_error() {
            self.total_faults.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count an active connection until the guard is dropped
    #[must_use]
    pub fn track_connection(self: &Arc<Self>) -> ConnectionGuard {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard {
            metrics: Arc::clone(self),
        }
    }

    /// Requests received since start
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Error responses since start
    #[must_use]
    pub fn total_errors(&self) -> u64 {
        self.total_errors.load(Ordering::Relaxed)
    }

    /// Server-fault responses since start
    #[must_use]
    pub fn total_faults(&self) -> u64 {
        self.total_faults.load(Ordering::Relaxed)
    }

    /// Requests in flight
    #[must_use]
    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Wall-clock start time, if ever started
    #[must_use]
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        let started = *self.started.read();
        started.map(|(_, at)| at)
    }

    /// Whole seconds since the last start
    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        let started = *self.started.read();
        started.map_or(0, |(at, _)| at.elapsed().as_secs())
    }
}

/// Decrements the active connection count on drop.
///
/// Dropped when the response is produced or when the request future is
/// abandoned after a client disconnect.
#[derive(Debug)]
pub struct ConnectionGuard {
    metrics: Arc<Metrics>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        // saturating: a reset may have zeroed the counter under a live guard
        let _ = self.metrics.active_connections.fetch_update(
            Ordering::Relaxed,
            Ordering::Relaxed,
            |n| n.checked_sub(1),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_count_all_4xx_and_5xx() {
        let metrics = Metrics::new();
        metrics.record_response(StatusCode::OK);
        metrics.record_response(StatusCode::NO_CONTENT);
        metrics.record_response(StatusCode::NOT_FOUND);
        metrics.record_response(StatusCode::TOO_MANY_REQUESTS);
        metrics.record_response(StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(metrics.total_errors(), 3);
        assert_eq!(metrics.total_faults(), 1);
    }

    #[test]
    fn guard_decrements_on_drop() {
        let metrics = Arc::new(Metrics::new());
        let first = metrics.track_connection();
        let second = metrics.track_connection();
        assert_eq!(metrics.active_connections(), 2);

        drop(first);
        assert_eq!(metrics.active_connections(), 1);
        drop(second);
        assert_eq!(metrics.active_connections(), 0);
    }

    #[test]
    fn guard_never_underflows_after_reset() {
        let metrics = Arc::new(Metrics::new());
        let guard = metrics.track_connection();
        metrics.reset();
        drop(guard);
        assert_eq!(metrics.active_connections(), 0);
    }

    #[test]
    fn reset_zeroes_counters_and_stamps_start() {
        let metrics = Metrics::new();
        assert!(metrics.start_time().is_none());
        assert_eq!(metrics.uptime_seconds(), 0);

        metrics.record_request();
        metrics.record_response(StatusCode::NOT_FOUND);
        metrics.reset();

        assert_eq!(metrics.total_requests(), 0);
        assert_eq!(metrics.total_errors(), 0);
        assert!(metrics.start_time().is_some());
    }
}
