//! Observability counters for the gossip core.
//!
//! Plain in-process counters, not a metrics backend: the embedding
//! application reads a [`MetricsSnapshot`] and exports it however it likes.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters surfaced by the gossip core.
#[derive(Debug, Default)]
pub struct GossipMetrics {
    duplicate: Mutex<HashMap<String, u64>>,
    novel: Mutex<HashMap<String, u64>>,
    intake_depth: AtomicUsize,
}

impl GossipMetrics {
    /// Creates zeroed metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a duplicate message on `protocol`.
    pub fn record_duplicate(&self, protocol: &str) {
        *self.duplicate.lock().entry(protocol.to_owned()).or_insert(0) += 1;
    }

    /// Records a novel message on `protocol`.
    pub fn record_novel(&self, protocol: &str) {
        *self.novel.lock().entry(protocol.to_owned()).or_insert(0) += 1;
    }

    /// Updates the current depth of the propagation intake channel.
    pub fn set_intake_depth(&self, depth: usize) {
        self.intake_depth.store(depth, Ordering::Relaxed);
    }

    /// Duplicate-message count for `protocol`.
    #[must_use]
    pub fn duplicate_count(&self, protocol: &str) -> u64 {
        self.duplicate.lock().get(protocol).copied().unwrap_or(0)
    }

    /// Novel-message count for `protocol`.
    #[must_use]
    pub fn novel_count(&self, protocol: &str) -> u64 {
        self.novel.lock().get(protocol).copied().unwrap_or(0)
    }

    /// Last recorded depth of the propagation intake channel.
    #[must_use]
    pub fn intake_depth(&self) -> usize {
        self.intake_depth.load(Ordering::Relaxed)
    }

    /// Returns a point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            duplicate: self.duplicate.lock().clone(),
            novel: self.novel.lock().clone(),
            intake_depth: self.intake_depth(),
        }
    }
}

/// Point-in-time copy of the gossip counters.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Duplicate messages dropped, by sub-protocol.
    pub duplicate: HashMap<String, u64>,
    /// Novel messages accepted for validation, by sub-protocol.
    pub novel: HashMap<String, u64>,
    /// Depth of the propagation intake channel when the snapshot was taken.
    pub intake_depth: usize,
}
