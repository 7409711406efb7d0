//! In-process service counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Counters shared by the prediction path and the retraining workflow
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    // Prediction metrics
    pub predictions: Arc<AtomicU64>,
    pub batch_requests: Arc<AtomicU64>,
    pub rejected_requests: Arc<AtomicU64>,

    // Model cache
    pub cache_hits: Arc<AtomicU64>,
    pub cache_misses: Arc<AtomicU64>,

    // Version lifecycle
    pub retrains_succeeded: Arc<AtomicU64>,
    pub retrains_failed: Arc<AtomicU64>,
    /// Any mutation turned away by the lock, not only retrains
    pub mutations_rejected: Arc<AtomicU64>,
    pub version_switches: Arc<AtomicU64>,
    pub training_duration_ms: Arc<AtomicU64>,

    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            predictions: Arc::new(AtomicU64::new(0)),
            batch_requests: Arc::new(AtomicU64::new(0)),
            rejected_requests: Arc::new(AtomicU64::new(0)),
            cache_hits: Arc::new(AtomicU64::new(0)),
            cache_misses: Arc::new(AtomicU64::new(0)),
            retrains_succeeded: Arc::new(AtomicU64::new(0)),
            retrains_failed: Arc::new(AtomicU64::new(0)),
            mutations_rejected: Arc::new(AtomicU64::new(0)),
            version_switches: Arc::new(AtomicU64::new(0)),
            training_duration_ms: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Record `count` served predictions; batches also bump `batch_requests`.
    pub fn record_predictions(&self, count: usize, batch: bool) {
        self.predictions.fetch_add(count as u64, Ordering::Relaxed);
        if batch {
            self.batch_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_rejected(&self) {
        self.rejected_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache(&self, hit: bool) {
        let counter = if hit { &self.cache_hits } else { &self.cache_misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retrain(&self, success: bool, duration_ms: u64) {
        if success {
            self.retrains_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.retrains_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.training_duration_ms
            .fetch_add(duration_ms, Ordering::Relaxed);
    }

    /// A mutation turned away because another one held the lock
    pub fn record_busy(&self) {
        self.mutations_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_switch(&self) {
        self.version_switches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            predictions: self.predictions.load(Ordering::Relaxed),
            batch_requests: self.batch_requests.load(Ordering::Relaxed),
            rejected_requests: self.rejected_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            retrains_succeeded: self.retrains_succeeded.load(Ordering::Relaxed),
            retrains_failed: self.retrains_failed.load(Ordering::Relaxed),
            mutations_rejected: self.mutations_rejected.load(Ordering::Relaxed),
            version_switches: self.version_switches.load(Ordering::Relaxed),
            training_duration_ms: self.training_duration_ms.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub predictions: u64,
    pub batch_requests: u64,
    pub rejected_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub retrains_succeeded: u64,
    pub retrains_failed: u64,
    pub mutations_rejected: u64,
    pub version_switches: u64,
    pub training_duration_ms: u64,
    pub uptime_seconds: u64,
}
