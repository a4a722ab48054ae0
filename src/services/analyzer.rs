//! Analysis orchestration
//!
//! Drives one analysis end to end: parse the URL, validate the repository
//! upstream, crawl to the requested depth with live progress, reconcile
//! true totals, persist the record, and bump the global counter. The
//! progress entry lives exactly as long as the crawl, whatever the
//! outcome.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::github::{parse_repo_url, GitHubClient, GitHubError, ParseError, RepoMetadata, RepoRef};
use crate::models::{
    AnalysisStats, AnalyzeResponse, CrawlProgress, RepositoryRecord, ValidatedRepo,
};
use crate::services::crawler::{CrawlError, TreeCrawler};
use crate::services::progress::ProgressStore;
use crate::services::reconciler::CountReconciler;
use crate::services::storage::{RepositoryStore, StorageError};

/// Progress value set once validation has passed, before crawling starts.
const VALIDATED_PERCENT: u8 = 10;

/// Counter bumped once per completed analysis.
pub const ANALYSES_COUNTER: &str = "analyses_completed";

/// Errors that can occur during an analysis. Each variant carries the one
/// user-facing sentence for its failure class.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Repository not found. Check the URL, or the repository may be private.")]
    NotFound,

    #[error("Access to that repository is forbidden: {0}")]
    AccessDenied(String),

    #[error("GitHub rate limit reached: {0}. Configure a token or try again later.")]
    RateLimited(String),

    #[error("That repository is empty; there is nothing to analyze.")]
    EmptyRepository,

    #[error("That repository has no default branch and cannot be analyzed.")]
    NoDefaultBranch,

    #[error("Could not reach GitHub: {0}")]
    Upstream(String),

    /// User-initiated. Reported as an outcome, never logged as a failure.
    #[error("Analysis was cancelled")]
    Cancelled,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<GitHubError> for AnalysisError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::NotFound => Self::NotFound,
            GitHubError::AccessDenied(msg) => Self::AccessDenied(msg),
            GitHubError::RateLimited(msg) => Self::RateLimited(msg),
            GitHubError::Upstream(msg) | GitHubError::Decode(msg) | GitHubError::Client(msg) => {
                Self::Upstream(msg)
            }
        }
    }
}

/// Service owning the analysis flow.
#[derive(Clone)]
pub struct AnalysisService {
    github: GitHubClient,
    progress: ProgressStore,
    repos: Arc<dyn RepositoryStore>,
}

impl AnalysisService {
    pub fn new(github: GitHubClient, progress: ProgressStore, repos: Arc<dyn RepositoryStore>) -> Self {
        Self {
            github,
            progress,
            repos,
        }
    }

    /// Parse and validate without crawling. No state is created.
    pub async fn validate(&self, url: &str) -> Result<ValidatedRepo, AnalysisError> {
        let repo_ref = parse_repo_url(url)?;
        let metadata = self.validated_metadata(&repo_ref).await?;
        // checked by validated_metadata
        let default_branch = metadata.default_branch.clone().unwrap_or_default();

        Ok(ValidatedRepo {
            owner: repo_ref.owner,
            repo: repo_ref.repo,
            visibility: visibility_of(&metadata),
            default_branch,
            description: metadata.description,
            language: metadata.language,
            size_kib: metadata.size,
            star_count: metadata.stargazers_count,
            fork_count: metadata.forks_count,
        })
    }

    /// Run one full analysis for `user_id`. `max_depth` must already be
    /// clamped at the HTTP boundary. A client-supplied `analysis_id` lets
    /// the caller poll and cancel while this call is still running.
    pub async fn analyze(
        &self,
        user_id: &str,
        url: &str,
        max_depth: u32,
        analysis_id: Option<String>,
    ) -> Result<AnalyzeResponse, AnalysisError> {
        let repo_ref = parse_repo_url(url)?;
        let metadata = self.validated_metadata(&repo_ref).await?;

        let analysis_id = analysis_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut progress = CrawlProgress::new(analysis_id.clone(), user_id.to_string(), max_depth);
        progress.percent_complete = VALIDATED_PERCENT;
        self.progress.insert(progress).await;

        let result = self
            .run(&repo_ref, &metadata, user_id, url, max_depth, &analysis_id)
            .await;

        if result.is_ok() {
            self.progress.complete(&analysis_id).await;
        }
        // Terminated by any path: the entry goes away.
        self.progress.remove(&analysis_id).await;
        result
    }

    async fn run(
        &self,
        repo_ref: &RepoRef,
        metadata: &RepoMetadata,
        user_id: &str,
        url: &str,
        max_depth: u32,
        analysis_id: &str,
    ) -> Result<AnalyzeResponse, AnalysisError> {
        let owner = repo_ref.owner.as_str();
        let repo = repo_ref.repo.as_str();
        let branch = metadata.default_branch.as_deref().unwrap_or_default();

        let crawler = TreeCrawler::new(self.github.clone(), self.progress.clone());
        let tree = match crawler.crawl(owner, repo, max_depth, analysis_id).await {
            Ok(tree) => tree,
            Err(CrawlError::Cancelled) => {
                info!(%analysis_id, "analysis cancelled by user");
                return Err(AnalysisError::Cancelled);
            }
            Err(CrawlError::Upstream(e)) => return Err(e.into()),
        };

        let reconciler = CountReconciler::new(self.github.clone());
        let totals = match reconciler.totals(owner, repo, branch).await {
            Ok(totals) => totals,
            Err(e) => {
                // Degraded path: count the bounded tree instead. A strict
                // underestimate of the repository, never a hard failure.
                warn!(%owner, %repo, error = %e, "flattened listing failed; counting bounded tree");
                CountReconciler::totals_from_tree(&tree)
            }
        };

        // A cancel that lands between crawl completion and persistence
        // still wins: nothing is written.
        if self.progress.is_cancelled(analysis_id).await {
            info!(%analysis_id, "analysis cancelled before persistence");
            return Err(AnalysisError::Cancelled);
        }

        let stats = AnalysisStats {
            analyzed_files: tree.count_files(),
            analyzed_folders: tree.count_folders(),
            total_files: totals.total_files,
            total_folders: totals.total_folders,
            analyzed_depth: max_depth,
            total_depth: totals.max_depth,
            total_size_bytes: totals.total_size_bytes,
            visibility: visibility_of(metadata),
            language: metadata.language.clone(),
            description: metadata.description.clone(),
            star_count: metadata.stargazers_count,
            fork_count: metadata.forks_count,
            last_analyzed: Utc::now(),
        };

        let record = RepositoryRecord {
            record_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            repo_url: url.trim().to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            tree,
            stats,
            created_at: Utc::now(),
        };
        self.repos.insert_record(&record).await?;

        if let Err(e) = self.repos.increment_counter(ANALYSES_COUNTER).await {
            warn!(error = %e, "failed to bump analysis counter");
        }

        let was_truncated = totals.max_depth > max_depth;
        Ok(AnalyzeResponse {
            analysis_id: analysis_id.to_string(),
            record,
            was_truncated,
        })
    }

    /// One metadata lookup, mapped to the validation taxonomy.
    async fn validated_metadata(&self, repo_ref: &RepoRef) -> Result<RepoMetadata, AnalysisError> {
        let metadata = self
            .github
            .repo_metadata(&repo_ref.owner, &repo_ref.repo)
            .await?;

        if metadata.size == 0 {
            return Err(AnalysisError::EmptyRepository);
        }
        if metadata.default_branch.as_deref().unwrap_or("").is_empty() {
            return Err(AnalysisError::NoDefaultBranch);
        }
        Ok(metadata)
    }
}

fn visibility_of(metadata: &RepoMetadata) -> String {
    if metadata.private { "private" } else { "public" }.to_string()
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use crate::github::RetryConfig;
    use crate::services::storage::MemoryStorage;

    use super::*;

    fn service_for(
        server: &mockito::ServerGuard,
    ) -> (AnalysisService, ProgressStore, Arc<MemoryStorage>) {
        let github = GitHubClient::new(&server.url(), None, Duration::from_secs(5))
            .unwrap()
            .with_retry(RetryConfig {
                max_retries: 0,
                base_delay_secs: 0.0,
                backoff_factor: 1.0,
                jitter: 0.0,
            });
        let progress = ProgressStore::new();
        let storage = Arc::new(MemoryStorage::new());
        let service = AnalysisService::new(github, progress.clone(), storage.clone());
        (service, progress, storage)
    }

    fn metadata_body() -> String {
        serde_json::json!({
            "name": "r", "full_name": "o/r", "private": false,
            "default_branch": "main", "language": "Rust",
            "description": "demo", "size": 120,
            "stargazers_count": 3, "forks_count": 1
        })
        .to_string()
    }

    fn file_json(name: &str, path: &str, size: u64) -> serde_json::Value {
        serde_json::json!({"name": name, "path": path, "type": "file", "size": size})
    }

    fn dir_json(name: &str, path: &str) -> serde_json::Value {
        serde_json::json!({"name": name, "path": path, "type": "dir", "size": 0})
    }

    async fn mock_small_repo(server: &mut mockito::ServerGuard) {
        server
            .mock("GET", "/repos/o/r")
            .with_body(metadata_body())
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/contents")
            .with_body(
                serde_json::json!([
                    file_json("README.md", "README.md", 100),
                    file_json("main.rs", "main.rs", 200),
                    file_json("lib.rs", "lib.rs", 300),
                    dir_json("src", "src"),
                ])
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/contents/src")
            .with_body(serde_json::json!([file_json("util.rs", "src/util.rs", 50)]).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/git/trees/main?recursive=1")
            .with_body(
                serde_json::json!({"truncated": false, "tree": [
                    {"path": "README.md", "type": "blob", "size": 100},
                    {"path": "main.rs", "type": "blob", "size": 200},
                    {"path": "lib.rs", "type": "blob", "size": 300},
                    {"path": "src", "type": "tree"},
                    {"path": "src/util.rs", "type": "blob", "size": 50},
                ]})
                .to_string(),
            )
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn small_repo_analysis_matches_reconciled_totals() {
        let mut server = mockito::Server::new_async().await;
        mock_small_repo(&mut server).await;
        let (service, progress, storage) = service_for(&server);

        let response = service
            .analyze("u1", "https://github.com/o/r", 5, None)
            .await
            .unwrap();

        let stats = &response.record.stats;
        assert_eq!(stats.analyzed_files, 4);
        assert_eq!(stats.analyzed_folders, 1);
        assert_eq!(stats.total_files, stats.analyzed_files);
        assert_eq!(stats.total_folders, stats.analyzed_folders);
        assert!(!response.was_truncated);
        assert_eq!(response.record.tree.children.as_ref().unwrap().len(), 4);

        // Persisted, counted, progress gone.
        assert_eq!(storage.list_records("u1").await.unwrap().len(), 1);
        assert_eq!(storage.get_counter(ANALYSES_COUNTER).await.unwrap(), 1);
        assert!(progress.get(&response.analysis_id).await.is_none());
    }

    #[tokio::test]
    async fn deep_repo_reports_truncation_against_true_depth() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/o/r")
            .with_body(metadata_body())
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/contents")
            .with_body(serde_json::json!([dir_json("d1", "d1")]).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/contents/d1")
            .with_body(serde_json::json!([dir_json("d2", "d1/d2")]).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/contents/d1/d2")
            .with_body(serde_json::json!([dir_json("d3", "d1/d2/d3")]).to_string())
            .create_async()
            .await;
        // Flattened listing: ten nested folders.
        let mut flat = Vec::new();
        let mut prefix = String::new();
        for i in 1..=10 {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(&format!("d{i}"));
            flat.push(serde_json::json!({"path": prefix, "type": "tree"}));
        }
        server
            .mock("GET", "/repos/o/r/git/trees/main?recursive=1")
            .with_body(serde_json::json!({"truncated": false, "tree": flat}).to_string())
            .create_async()
            .await;

        let (service, _, _) = service_for(&server);
        let response = service
            .analyze("u1", "https://github.com/o/r", 3, None)
            .await
            .unwrap();

        assert!(response.was_truncated);
        assert_eq!(response.record.stats.total_depth, 10);
        assert_eq!(response.record.stats.analyzed_depth, 3);
        assert!(response.record.tree.max_depth() <= 3);

        // The folder sitting exactly at the bound is truncated and empty.
        let d3 = &response.record.tree.children.as_ref().unwrap()[0]
            .children
            .as_ref()
            .unwrap()[0]
            .children
            .as_ref()
            .unwrap()[0];
        assert!(d3.truncated);
        assert_eq!(d3.children.as_deref(), Some(&[][..]));
    }

    #[tokio::test]
    async fn missing_repository_is_rejected_before_any_crawl() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/o/r")
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;
        let contents = server
            .mock("GET", "/repos/o/r/contents")
            .expect(0)
            .create_async()
            .await;

        let (service, _, storage) = service_for(&server);
        let err = service
            .analyze("u1", "https://github.com/o/r", 5, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::NotFound));
        assert!(err.to_string().contains("not found"));
        assert!(storage.list_records("u1").await.unwrap().is_empty());
        contents.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_url_makes_no_network_call() {
        let mut server = mockito::Server::new_async().await;
        let any = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let (service, _, _) = service_for(&server);
        let err = service
            .analyze("u1", "https://example.com/owner/repo", 5, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Parse(_)));
        any.assert_async().await;
    }

    #[tokio::test]
    async fn empty_repository_is_unprocessable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/o/r")
            .with_body(
                serde_json::json!({
                    "name": "r", "full_name": "o/r", "private": false,
                    "default_branch": "main", "size": 0
                })
                .to_string(),
            )
            .create_async()
            .await;

        let (service, _, _) = service_for(&server);
        let err = service
            .analyze("u1", "https://github.com/o/r", 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyRepository));
    }

    #[tokio::test]
    async fn reconciler_failure_degrades_to_bounded_counts() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/o/r")
            .with_body(metadata_body())
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/contents")
            .with_body(serde_json::json!([file_json("a.rs", "a.rs", 10)]).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/git/trees/main?recursive=1")
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        let (service, _, _) = service_for(&server);
        let response = service
            .analyze("u1", "https://github.com/o/r", 5, None)
            .await
            .unwrap();

        let stats = &response.record.stats;
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.total_files, stats.analyzed_files);
        assert!(!response.was_truncated);
    }

    #[tokio::test]
    async fn cancellation_mid_crawl_persists_nothing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/o/r")
            .with_body(metadata_body())
            .create_async()
            .await;
        // Slow root listing gives the cancel request time to land.
        server
            .mock("GET", "/repos/o/r/contents")
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_millis(400));
                w.write_all(
                    serde_json::json!([
                        {"name": "a.rs", "path": "a.rs", "type": "file", "size": 1}
                    ])
                    .to_string()
                    .as_bytes(),
                )
            })
            .create_async()
            .await;

        let (service, progress, storage) = service_for(&server);
        let analysis_id = "cancel-me".to_string();

        let task = {
            let service = service.clone();
            let analysis_id = analysis_id.clone();
            tokio::spawn(async move {
                service
                    .analyze("u1", "https://github.com/o/r", 5, Some(analysis_id))
                    .await
            })
        };

        // Wait for the crawl to register, then cancel it.
        for _ in 0..50 {
            if progress.get(&analysis_id).await.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(progress.cancel(&analysis_id).await);

        let result = task.await.unwrap();
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
        assert!(storage.list_records("u1").await.unwrap().is_empty());
        assert_eq!(storage.get_counter(ANALYSES_COUNTER).await.unwrap(), 0);
        // The next poll reports the crawl absent.
        assert!(progress.get(&analysis_id).await.is_none());
    }
}
