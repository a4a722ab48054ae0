//! HTTP client for the GitHub REST API.
//!
//! Owns the transport concerns: bounded per-request timeouts, bearer
//! authentication when a token is configured, and exponential backoff with
//! jitter for transient failures. Permanent statuses (404, 403) are never
//! retried; they map to typed errors the services translate for the user.

use std::time::Duration;

use rand::Rng;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{ContentsEntry, FileContent, FlatTree, RepoMetadata};

/// Errors from talking to GitHub.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("Repository not found")]
    NotFound,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("GitHub rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("GitHub request failed: {0}")]
    Upstream(String),

    #[error("Unexpected GitHub response: {0}")]
    Decode(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl GitHubError {
    /// Transient failures worth another attempt. 404/403 are permanent by
    /// contract and never retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }
}

/// Configuration for automatic retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial request
    pub max_retries: u32,
    /// Base delay for exponential backoff, in seconds
    pub base_delay_secs: f64,
    /// Multiplier applied per attempt
    pub backoff_factor: f64,
    /// Jitter factor (0.1 = up to 10% extra)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_secs: 0.5,
            backoff_factor: 2.0,
            jitter: 0.1,
        }
    }
}

impl RetryConfig {
    fn delay(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay_secs * self.backoff_factor.powi(attempt as i32);
        let jitter = rand::thread_rng().gen_range(0.0..=self.jitter);
        Duration::from_secs_f64(backoff * (1.0 + jitter))
    }
}

/// Client for the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    retry: RetryConfig,
}

impl GitHubClient {
    /// Create a new client.
    ///
    /// `base_url` is the API root (`https://api.github.com` in production,
    /// a local stub in tests). A missing `token` is a valid mode with
    /// lower upstream rate limits, not an error.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GitHubError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("repolens")
            .build()
            .map_err(|e| GitHubError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            retry: RetryConfig::default(),
        })
    }

    /// Override the retry policy (tests use a zero-delay policy).
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// `GET /repos/{owner}/{repo}` — repository metadata.
    pub async fn repo_metadata(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<RepoMetadata, GitHubError> {
        let url = format!("{}/repos/{owner}/{repo}", self.base_url);
        self.get_json(&url).await
    }

    /// `GET /repos/{owner}/{repo}/contents/{path}` — one directory level.
    ///
    /// An empty `path` lists the repository root.
    pub async fn list_dir(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<ContentsEntry>, GitHubError> {
        let url = if path.is_empty() {
            format!("{}/repos/{owner}/{repo}/contents", self.base_url)
        } else {
            format!("{}/repos/{owner}/{repo}/contents/{path}", self.base_url)
        };
        self.get_json(&url).await
    }

    /// `GET /repos/{owner}/{repo}/contents/{path}` — a single file with
    /// base64 content.
    pub async fn file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<FileContent, GitHubError> {
        let url = format!("{}/repos/{owner}/{repo}/contents/{path}", self.base_url);
        self.get_json(&url).await
    }

    /// `GET /repos/{owner}/{repo}/git/trees/{branch}?recursive=1` — the
    /// flattened full-repository listing.
    pub async fn flat_tree(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<FlatTree, GitHubError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/git/trees/{branch}?recursive=1",
            self.base_url
        );
        self.get_json(&url).await
    }

    /// Issue a GET and decode the JSON body, retrying transient failures
    /// with exponential backoff.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, GitHubError> {
        let mut attempt: u32 = 0;
        loop {
            match self.send(url).await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<T>()
                            .await
                            .map_err(|e| GitHubError::Decode(e.to_string()));
                    }

                    let err = Self::map_status(response).await;
                    if err.is_transient() && attempt < self.retry.max_retries {
                        let delay = self.retry.delay(attempt);
                        warn!(%url, %status, ?delay, "transient GitHub failure, retrying");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay(attempt);
                    warn!(%url, error = %e, ?delay, "GitHub request failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(GitHubError::Upstream(e.to_string())),
            }
        }
    }

    async fn send(&self, url: &str) -> Result<Response, reqwest::Error> {
        debug!(%url, "GitHub request");
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request.send().await
    }

    /// Map a non-success status to a typed error, distinguishing a 403
    /// rate-limit response from a plain permissions failure where the
    /// upstream signals it.
    async fn map_status(response: Response) -> GitHubError {
        let status = response.status();
        let rate_limit_exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "0")
            .unwrap_or(false);
        let message = upstream_message(response).await;

        match status {
            StatusCode::NOT_FOUND => GitHubError::NotFound,
            StatusCode::TOO_MANY_REQUESTS => GitHubError::RateLimited(message),
            StatusCode::FORBIDDEN => {
                if rate_limit_exhausted || message.to_lowercase().contains("rate limit") {
                    GitHubError::RateLimited(message)
                } else {
                    GitHubError::AccessDenied(message)
                }
            }
            s => GitHubError::Upstream(format!("GitHub returned {s}: {message}")),
        }
    }
}

/// Best-effort extraction of the upstream `message` field.
async fn upstream_message(response: Response) -> String {
    match response.json::<serde_json::Value>().await {
        Ok(body) => body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("no detail provided")
            .to_string(),
        Err(_) => "no detail provided".to_string(),
    }
}
