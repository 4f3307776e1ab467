//! Response models for the lookup service API
//!
//! HTML fragment rendering for lookup results plus JSON DTOs for the
//! health and stats endpoints.

pub mod responses;

// Re-export commonly used types
pub use responses::{repo_count_fragment, HealthResponse, StatsResponse};
