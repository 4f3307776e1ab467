//! Cache Module
//!
//! Defines the key-value store contract the lookup coordinator depends on,
//! plus the in-process adapter used by the server.

mod entry;
mod memory;


// Re-export public types
pub use entry::CacheEntry;
pub use memory::MemoryStore;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

// == Cache Store Contract ==
/// Key-value store with set-with-expiry semantics.
///
/// `get` distinguishes three outcomes: `Ok(Some(_))` for a live entry,
/// `Ok(None)` for a key that is absent or expired, and `Err(CacheUnavailable)`
/// when the store itself failed to respond. Absent and unreachable are
/// deliberately separate signals so the coordinator can fail open on the
/// latter without conflating the two.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the cached value for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key` with an expiry, overwriting any existing entry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}
