//! API Handlers
//!
//! HTTP request handlers for each lookup service endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Html,
    Json,
};

use crate::error::Result;
use crate::lookup::LookupCoordinator;
use crate::models::{repo_count_fragment, HealthResponse, StatsResponse};

/// Application state shared across all handlers.
///
/// Holds the lookup coordinator, which in turn owns the injected cache store
/// and upstream client. Constructed once in `main` before serving.
#[derive(Clone)]
pub struct AppState {
    /// Shared lookup coordinator
    pub coordinator: Arc<LookupCoordinator>,
}

impl AppState {
    /// Creates a new AppState wrapping the given coordinator.
    pub fn new(coordinator: LookupCoordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
        }
    }
}

/// Handler for GET /repos/:username
///
/// Resolves the public repository count for a username, serving from the
/// cache when possible. Errors map to 400 (invalid username), 404 (unknown
/// user), or 500 (upstream failure).
pub async fn repos_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Html<String>> {
    let resolution = state.coordinator.resolve(&username).await?;
    Ok(Html(repo_count_fragment(
        &resolution.username,
        resolution.repos,
    )))
}

/// Handler for GET /stats
///
/// Returns current lookup statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.coordinator.stats()))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
