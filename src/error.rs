//! Error types for the lookup service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

// == Lookup Error Enum ==
/// Unified error type for the lookup service.
#[derive(Error, Debug)]
pub enum LookupError {
    /// The username does not exist at the upstream source
    #[error("User not found: {0}")]
    NotFound(String),

    /// Network or protocol failure contacting upstream
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The cache store failed to respond
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// The username is not usable as a cache key or URL path segment
    #[error("Invalid username: {0}")]
    InvalidKey(String),
}

// == IntoResponse Implementation ==
// Cache read failures are absorbed by the coordinator (fail-open), so
// CacheUnavailable should not normally reach the HTTP boundary; if it
// does, it maps to a generic server error.
impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            LookupError::NotFound(username) => (
                StatusCode::NOT_FOUND,
                format!("<h2>User {username} not found on GitHub.</h2>"),
            ),
            LookupError::InvalidKey(msg) => (
                StatusCode::BAD_REQUEST,
                format!("<h2>Invalid username: {msg}</h2>"),
            ),
            LookupError::UpstreamUnavailable(_) | LookupError::CacheUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "<h2>Server error</h2>".to_string(),
            ),
        };

        (status, Html(body)).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the lookup service.
pub type Result<T> = std::result::Result<T, LookupError>;
