//! Response DTOs for the lookup service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::lookup::StatsSnapshot;

// == Lookup Fragment ==
/// Renders the HTML fragment returned for a successful lookup.
///
/// Usernames have already been validated to ASCII letters, digits, and
/// hyphens, so the fragment needs no escaping.
pub fn repo_count_fragment(username: &str, repos: u64) -> String {
    format!("<h1>{username}'s got <code>{repos}</code> public repos on <code>GitHub</code>.</h1>")
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Requests served from the cache
    pub hits: u64,
    /// Requests that went upstream
    pub misses: u64,
    /// Upstream calls actually issued
    pub upstream_fetches: u64,
    /// Misses that reused an in-flight fetch
    pub coalesced: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a counter snapshot
    pub fn new(snapshot: StatsSnapshot) -> Self {
        let hit_rate = snapshot.hit_rate();
        Self {
            hits: snapshot.hits,
            misses: snapshot.misses,
            upstream_fetches: snapshot.upstream_fetches,
            coalesced: snapshot.coalesced,
            hit_rate,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
