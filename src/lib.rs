//! repolens - GitHub repository analysis backend
//!
//! Validates a repository URL, crawls the file tree to a bounded depth
//! with live progress and cooperative cancellation, reconciles true
//! totals, persists the analysis per user, and proxies AI code
//! analysis/chat to an LLM provider.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod github;
pub mod handlers;
pub mod models;
pub mod services;

pub use config::{Config, ConfigError, StorageBackend};
pub use error::AppError;
pub use github::{GitHubClient, GitHubError, ParseError, RepoRef};
pub use services::{
    AnalysisError, AnalysisService, CodeAnalysis, CountReconciler, CrawlError, LlmClient,
    MemoryStorage, PgStorage, ProgressStore, RepositoryStore, StorageError, TreeCrawler, UserStore,
};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserStore>,
    pub repos: Arc<dyn RepositoryStore>,
    pub progress: ProgressStore,
    pub github: GitHubClient,
    pub llm: Option<LlmClient>,
}
