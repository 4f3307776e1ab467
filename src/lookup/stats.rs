//! Lookup Statistics Module
//!
//! Tracks cache-aside performance counters. Purely observational; no lookup
//! behavior depends on these values.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Lookup Stats ==
/// Atomic counters shared by all requests through one coordinator.
#[derive(Debug, Default)]
pub struct LookupStats {
    /// Requests served from the cache
    hits: AtomicU64,
    /// Requests that had to go upstream
    misses: AtomicU64,
    /// Actual upstream calls issued
    upstream_fetches: AtomicU64,
    /// Misses that piggybacked on an in-flight fetch instead of issuing their own
    coalesced: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub upstream_fetches: u64,
    pub coalesced: u64,
}

impl LookupStats {
    /// Creates a new LookupStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_fetch(&self) {
        self.upstream_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            upstream_fetches: self.upstream_fetches.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Calculates the cache hit rate, 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
