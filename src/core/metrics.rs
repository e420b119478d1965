//! Appender metrics for observability
//!
//! Counters describing what happened to the events offered to one appender.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-appender counters
///
/// # Example
///
/// ```
/// use hierlog::core::AppenderMetrics;
///
/// let metrics = AppenderMetrics::new();
/// metrics.record_appended();
/// metrics.record_denied();
///
/// assert_eq!(metrics.appended_count(), 1);
/// assert_eq!(metrics.denied_count(), 1);
/// ```
#[derive(Debug)]
pub struct AppenderMetrics {
    /// Events written to the sink
    appended: AtomicU64,

    /// Events rejected by the filter chain
    denied: AtomicU64,

    /// Events lost to an error or panic inside the appender
    failed: AtomicU64,

    /// Events offered while the appender was not started
    skipped: AtomicU64,
}

impl AppenderMetrics {
    pub const fn new() -> Self {
        Self {
            appended: AtomicU64::new(0),
            denied: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn appended_count(&self) -> u64 {
        self.appended.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn denied_count(&self) -> u64 {
        self.denied.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn skipped_count(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Returns the previous value
    #[inline]
    pub fn record_appended(&self) -> u64 {
        self.appended.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_denied(&self) -> u64 {
        self.denied.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_failed(&self) -> u64 {
        self.failed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_skipped(&self) -> u64 {
        self.skipped.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of offered events that were lost, as a percentage (0.0 - 100.0)
    ///
    /// Denied events are a deliberate outcome and do not count as lost.
    pub fn failure_rate(&self) -> f64 {
        let failed = self.failed_count() as f64;
        let total = self.appended_count() as f64 + failed;
        if total == 0.0 {
            0.0
        } else {
            (failed / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.appended.store(0, Ordering::Relaxed);
        self.denied.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
    }
}

impl Default for AppenderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for AppenderMetrics {
    /// Snapshot of the current values
    fn clone(&self) -> Self {
        Self {
            appended: AtomicU64::new(self.appended_count()),
            denied: AtomicU64::new(self.denied_count()),
            failed: AtomicU64::new(self.failed_count()),
            skipped: AtomicU64::new(self.skipped_count()),
        }
    }
}
