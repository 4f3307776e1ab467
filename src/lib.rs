//! Repo Lookup - A cache-aside HTTP lookup service
//!
//! Resolves GitHub public repository counts per username, caching results
//! for a fixed TTL to avoid redundant upstream calls.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod lookup;
pub mod models;
pub mod tasks;
pub mod upstream;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_cleanup_task;
