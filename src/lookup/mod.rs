//! Lookup Module
//!
//! The cache-aside core: per-request decision of whether to serve from the
//! cache or from upstream, and keeping the cache populated.

mod coordinator;
mod stats;

pub use coordinator::{
    validate_username, LookupCoordinator, Resolution, Source, MAX_USERNAME_LENGTH,
};
pub use stats::{LookupStats, StatsSnapshot};
