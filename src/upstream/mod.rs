//! Upstream Module
//!
//! The source-of-truth the cache sits in front of: a REST API queried once
//! per cache miss.

mod github;

pub use github::GitHubClient;

use async_trait::async_trait;

use crate::error::Result;

// == Upstream Contract ==
/// Origin lookup for a username's public repository count.
#[async_trait]
pub trait RepoSource: Send + Sync {
    /// Fetches the public repository count for `username`.
    ///
    /// Returns `NotFound` when the origin has no such user, and
    /// `UpstreamUnavailable` for any network, protocol, or decode failure.
    async fn fetch_public_repos(&self, username: &str) -> Result<u64>;
}
