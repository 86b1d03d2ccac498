//! Request counters and latency tracking.
//!
//! [`MetricsCollector`] is shared (via `Arc`) between the engine and its
//! transport. Counters are lock-free atomics; the running average latency
//! needs a read-modify-write and sits behind a short-lived mutex.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Snapshot of engine metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    /// Transport attempts made, retries included.
    pub total_requests: u64,
    /// Calls that ultimately succeeded.
    pub successful_requests: u64,
    /// Calls that ultimately failed.
    pub failed_requests: u64,
    /// Running mean latency of successful calls, in milliseconds.
    pub average_latency_ms: f64,
    /// Poll loops currently registered.
    pub active_polls: usize,
}

#[derive(Debug, Default)]
struct LatencyAverage {
    samples: u64,
    mean_ms: f64,
}

/// Thread-safe metrics recorder.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    latency: Mutex<LatencyAverage>,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one transport attempt.
    pub fn record_attempt(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a successful call and folds its latency into the running mean.
    pub fn record_success(&self, latency: Duration) {
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
        let latency_ms = latency.as_secs_f64() * 1000.0;
        // The mean stays a valid number even if a writer panicked.
        let mut avg = self
            .latency
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        avg.samples += 1;
        #[allow(clippy::cast_precision_loss)]
        let n = avg.samples as f64;
        avg.mean_ms += (latency_ms - avg.mean_ms) / n;
    }

    /// Counts a call that failed after its last attempt.
    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns current counters; `active_polls` is filled in by the engine.
    #[must_use]
    pub fn snapshot(&self) -> Metrics {
        let average_latency_ms = self
            .latency
            .lock()
            .map_or_else(|e| e.into_inner().mean_ms, |avg| avg.mean_ms);
        Metrics {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            average_latency_ms,
            active_polls: 0,
        }
    }
}
