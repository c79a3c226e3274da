//! Global atomic counters for migration runs.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a run).

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Counter values captured by [`Metrics::snapshot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub mappings_created: u64,
    pub grafts_applied: u64,
    pub replacements_issued: u64,
    pub frontier_misses: u64,
}

pub struct Metrics {
    mappings_created: AtomicU64,
    grafts_applied: AtomicU64,
    replacements_issued: AtomicU64,
    frontier_misses: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            mappings_created: AtomicU64::new(0),
            grafts_applied: AtomicU64::new(0),
            replacements_issued: AtomicU64::new(0),
            frontier_misses: AtomicU64::new(0),
        }
    }

    pub fn inc_mappings_created(&self) {
        self.mappings_created.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "mappings_created", "counter incremented");
    }

    pub fn inc_grafts_applied(&self) {
        self.grafts_applied.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "grafts_applied", "counter incremented");
    }

    pub fn inc_replacements_issued(&self) {
        self.replacements_issued.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "replacements_issued", "counter incremented");
    }

    pub fn inc_frontier_misses(&self) {
        self.frontier_misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "frontier_misses", "counter incremented");
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            mappings_created: self.mappings_created(),
            grafts_applied: self.grafts_applied(),
            replacements_issued: self.replacements_issued(),
            frontier_misses: self.frontier_misses(),
        }
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        let snap = self.snapshot();
        tracing::info!(
            event = "metrics.flush",
            mappings_created = snap.mappings_created,
            grafts_applied = snap.grafts_applied,
            replacements_issued = snap.replacements_issued,
            frontier_misses = snap.frontier_misses,
        );
    }

    pub fn mappings_created(&self) -> u64 {
        self.mappings_created.load(Ordering::Relaxed)
    }

    pub fn grafts_applied(&self) -> u64 {
        self.grafts_applied.load(Ordering::Relaxed)
    }

    pub fn replacements_issued(&self) -> u64 {
        self.replacements_issued.load(Ordering::Relaxed)
    }

    pub fn frontier_misses(&self) -> u64 {
        self.frontier_misses.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.mappings_created.store(0, Ordering::Relaxed);
        self.grafts_applied.store(0, Ordering::Relaxed);
        self.replacements_issued.store(0, Ordering::Relaxed);
        self.frontier_misses.store(0, Ordering::Relaxed);
    }
}
