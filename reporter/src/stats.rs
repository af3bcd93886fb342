//! Reporter poll counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Counters for the reporter service.
#[derive(Debug)]
pub struct ReportStats {
    /// Total poll cycles.
    poll_cycles: AtomicU64,

    /// Polls that produced a report.
    reports: AtomicU64,

    /// Polls that failed to fetch or decode.
    failures: AtomicU64,

    /// Reports whose best bid was at or above the best ask.
    crossed_books: AtomicU64,

    /// Start time for uptime.
    start_time: Instant,
}

impl Default for ReportStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportStats {
    /// Creates a zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            poll_cycles: AtomicU64::new(0),
            reports: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            crossed_books: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a poll cycle.
    pub fn record_poll(&self) {
        self.poll_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a produced report.
    pub fn record_report(&self, crossed: bool) {
        self.reports.fetch_add(1, Ordering::Relaxed);
        if crossed {
            self.crossed_books.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a failed poll.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns poll cycles.
    #[must_use]
    pub fn poll_cycles(&self) -> u64 {
        self.poll_cycles.load(Ordering::Relaxed)
    }

    /// Returns produced reports.
    #[must_use]
    pub fn reports(&self) -> u64 {
        self.reports.load(Ordering::Relaxed)
    }

    /// Returns failed polls.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Returns reports of crossed books.
    #[must_use]
    pub fn crossed_books(&self) -> u64 {
        self.crossed_books.load(Ordering::Relaxed)
    }

    /// Returns the uptime.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns a snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> ReportStatsSnapshot {
        ReportStatsSnapshot {
            poll_cycles: self.poll_cycles(),
            reports: self.reports(),
            failures: self.failures(),
            crossed_books: self.crossed_books(),
            uptime_secs: self.uptime().as_secs(),
        }
    }
}

/// Point-in-time copy of [`ReportStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportStatsSnapshot {
    /// Total poll cycles.
    pub poll_cycles: u64,
    /// Polls that produced a report.
    pub reports: u64,
    /// Failed polls.
    pub failures: u64,
    /// Reports of crossed books.
    pub crossed_books: u64,
    /// Seconds since start.
    pub uptime_secs: u64,
}
