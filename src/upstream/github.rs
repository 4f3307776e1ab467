//! GitHub API client.
//!
//! Issues a single GET per lookup and decodes the `public_repos` field from
//! the user resource.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::{LookupError, Result};
use crate::upstream::RepoSource;

// GitHub rejects requests without a User-Agent
const USER_AGENT_VALUE: &str = "repo-lookup";

// == GitHub Client ==
/// `RepoSource` implementation backed by the GitHub REST API.
pub struct GitHubClient {
    client: Client,
    base_url: String,
}

impl GitHubClient {
    /// Creates a client for the given API base URL with a bounded request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT_VALUE)
            .timeout(timeout)
            .build()
            .map_err(|err| LookupError::UpstreamUnavailable(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

/// Decoded upstream response; only the repository count is used.
#[derive(Debug, Deserialize)]
struct GitHubUser {
    public_repos: u64,
}

#[async_trait]
impl RepoSource for GitHubClient {
    async fn fetch_public_repos(&self, username: &str) -> Result<u64> {
        let url = format!("{}/users/{}", self.base_url, username);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| LookupError::UpstreamUnavailable(err.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(LookupError::NotFound(username.to_string())),
            status if status.is_success() => {
                let user: GitHubUser = response.json().await.map_err(|err| {
                    LookupError::UpstreamUnavailable(format!("malformed upstream body: {err}"))
                })?;
                Ok(user.public_repos)
            }
            status => Err(LookupError::UpstreamUnavailable(format!(
                "upstream returned HTTP {status}"
            ))),
        }
    }
}
