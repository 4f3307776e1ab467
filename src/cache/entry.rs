//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single cached value with its expiry instant.
///
/// Every entry carries a TTL; an expired entry is indistinguishable from an
/// absent one as far as readers are concerned.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: String,
    /// Instant after which the entry is treated as absent
    pub expires_at: Instant,
}

impl CacheEntry {
    /// Creates a new cache entry expiring `ttl` from now.
    pub fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current instant is at
    /// or past the expiry instant, so a zero TTL expires immediately.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Returns remaining time before expiry, zero if already expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}
