//! Tree Crawler
//!
//! Depth-bounded traversal of a repository's directory tree. One contents
//! call per directory level, children processed in upstream listing order,
//! sequential by design so the rate-limited upstream sees a bounded call
//! rate and ordering stays deterministic.
//!
//! Cancellation is cooperative: the shared progress flag is checked before
//! each directory listing and before each sibling entry, so cancel latency
//! is bounded by one in-flight upstream call plus one entry.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tracing::{debug, warn};

use crate::github::{GitHubClient, GitHubError};
use crate::models::TreeNode;
use crate::services::denylist;
use crate::services::progress::ProgressStore;

/// Progress percentage reserved below the crawl window (validation).
const PROGRESS_FLOOR: u8 = 10;
/// Progress percentage reserved above the crawl window (finalization).
const PROGRESS_CEILING: u8 = 90;

/// Errors that abort an entire crawl. Failures on non-root directories do
/// not appear here; they degrade to annotations on the affected node.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The cancellation flag was observed set. Not a failure; nothing is
    /// persisted.
    #[error("Analysis was cancelled")]
    Cancelled,

    /// The root listing failed, leaving nothing to build a tree from.
    #[error(transparent)]
    Upstream(GitHubError),
}

/// Depth-bounded repository tree crawler.
#[derive(Debug, Clone)]
pub struct TreeCrawler {
    github: GitHubClient,
    progress: ProgressStore,
}

impl TreeCrawler {
    pub fn new(github: GitHubClient, progress: ProgressStore) -> Self {
        Self { github, progress }
    }

    /// Crawl `owner/repo` down to `max_depth`, updating the progress entry
    /// under `analysis_id` after every directory fetch.
    ///
    /// The returned root is a synthetic folder named after the repository,
    /// at depth 0, with no `path` of its own.
    pub async fn crawl(
        &self,
        owner: &str,
        repo: &str,
        max_depth: u32,
        analysis_id: &str,
    ) -> Result<TreeNode, CrawlError> {
        if self.progress.is_cancelled(analysis_id).await {
            return Err(CrawlError::Cancelled);
        }

        let entries = self
            .github
            .list_dir(owner, repo, "")
            .await
            .map_err(CrawlError::Upstream)?;
        self.report(analysis_id, 0, max_depth, "").await;

        let children = self
            .crawl_level(owner, repo, entries, 1, max_depth, analysis_id)
            .await?;

        Ok(TreeNode::folder(repo.to_string(), None, children, 0))
    }

    /// Convert one listed directory level into child nodes, recursing into
    /// retained subdirectories.
    async fn crawl_level(
        &self,
        owner: &str,
        repo: &str,
        entries: Vec<crate::github::ContentsEntry>,
        depth: u32,
        max_depth: u32,
        analysis_id: &str,
    ) -> Result<Vec<TreeNode>, CrawlError> {
        let mut children = Vec::new();

        for entry in entries {
            if self.progress.is_cancelled(analysis_id).await {
                return Err(CrawlError::Cancelled);
            }

            if entry.is_dir() {
                if denylist::is_noise_dir(&entry.name) {
                    debug!(path = %entry.path, "skipping denylisted directory");
                    continue;
                }
                let node = self
                    .crawl_dir(owner, repo, entry.name, entry.path, depth, max_depth, analysis_id)
                    .await?;
                children.push(node);
            } else if entry.is_file() {
                if denylist::is_noise_file(&entry.name) {
                    debug!(path = %entry.path, "skipping denylisted file");
                    continue;
                }
                children.push(TreeNode::file(
                    entry.name,
                    entry.path,
                    entry.size,
                    entry.download_url,
                    depth,
                ));
            }
            // Symlinks and submodules are neither descended nor counted.
        }

        Ok(children)
    }

    /// Produce the node for one subdirectory. The depth bound is the sole
    /// truncation rule: at `depth >= max_depth` the folder is returned
    /// truncated with zero children and no listing call is made.
    fn crawl_dir<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        name: String,
        path: String,
        depth: u32,
        max_depth: u32,
        analysis_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TreeNode, CrawlError>> + Send + 'a>> {
        Box::pin(async move {
            if depth >= max_depth {
                return Ok(TreeNode::truncated_folder(name, path, depth, max_depth));
            }

            if self.progress.is_cancelled(analysis_id).await {
                return Err(CrawlError::Cancelled);
            }

            let entries = match self.github.list_dir(owner, repo, &path).await {
                Ok(entries) => entries,
                Err(e) => {
                    // A failed subdirectory degrades to an annotated node;
                    // the rest of the tree still completes.
                    warn!(%path, error = %e, "subdirectory listing failed");
                    return Ok(TreeNode::error_folder(name, path, depth, e.to_string()));
                }
            };
            self.report(analysis_id, depth, max_depth, &path).await;

            let children = self
                .crawl_level(owner, repo, entries, depth + 1, max_depth, analysis_id)
                .await?;

            Ok(TreeNode::folder(name, Some(path), children, depth))
        })
    }

    /// Depth-proportional progress inside the (10, 90) window; validation
    /// and finalization bracket the crawl's visible range. The store
    /// enforces that the value never regresses.
    async fn report(&self, analysis_id: &str, depth: u32, max_depth: u32, path: &str) {
        let span = (PROGRESS_CEILING - PROGRESS_FLOOR) as u64;
        let advance = (depth as u64 * span) / max_depth.max(1) as u64;
        let percent = (PROGRESS_FLOOR as u64 + advance).min(PROGRESS_CEILING as u64) as u8;
        self.progress.update(analysis_id, percent, depth, path).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::github::RetryConfig;
    use crate::models::{CrawlProgress, NodeKind};

    use super::*;

    fn test_client(server: &mockito::ServerGuard) -> GitHubClient {
        GitHubClient::new(&server.url(), None, Duration::from_secs(5))
            .unwrap()
            .with_retry(RetryConfig {
                max_retries: 0,
                base_delay_secs: 0.0,
                backoff_factor: 1.0,
                jitter: 0.0,
            })
    }

    async fn tracked_crawler(server: &mockito::ServerGuard, max_depth: u32) -> (TreeCrawler, ProgressStore) {
        let progress = ProgressStore::new();
        progress
            .insert(CrawlProgress::new("a1".into(), "u1".into(), max_depth))
            .await;
        (TreeCrawler::new(test_client(server), progress.clone()), progress)
    }

    fn file_json(name: &str, path: &str, size: u64) -> serde_json::Value {
        serde_json::json!({
            "name": name, "path": path, "type": "file", "size": size,
            "download_url": format!("https://raw.example/{path}")
        })
    }

    fn dir_json(name: &str, path: &str) -> serde_json::Value {
        serde_json::json!({"name": name, "path": path, "type": "dir", "size": 0})
    }

    #[tokio::test]
    async fn small_repo_crawls_fully_without_truncation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/o/r/contents")
            .with_body(
                serde_json::json!([
                    file_json("README.md", "README.md", 120),
                    file_json("main.rs", "main.rs", 300),
                    file_json("lib.rs", "lib.rs", 250),
                    dir_json("src", "src"),
                ])
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/contents/src")
            .with_body(serde_json::json!([file_json("util.rs", "src/util.rs", 90)]).to_string())
            .create_async()
            .await;

        let (crawler, _) = tracked_crawler(&server, 5).await;
        let tree = crawler.crawl("o", "r", 5, "a1").await.unwrap();

        let children = tree.children.as_ref().unwrap();
        assert_eq!(children.len(), 4);
        assert!(children.iter().all(|c| c.depth_reached == 1));
        assert_eq!(tree.count_files(), 4);
        assert_eq!(tree.count_folders(), 1);

        fn no_truncation(node: &TreeNode) -> bool {
            !node.truncated && node.children.iter().flatten().all(no_truncation)
        }
        assert!(no_truncation(&tree));
    }

    #[tokio::test]
    async fn depth_bound_truncates_with_empty_children() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/o/r/contents")
            .with_body(serde_json::json!([dir_json("a", "a")]).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/contents/a")
            .with_body(serde_json::json!([dir_json("b", "a/b")]).to_string())
            .create_async()
            .await;
        // Depth 2 folder gets expanded; its child folder sits at the bound.
        server
            .mock("GET", "/repos/o/r/contents/a/b")
            .with_body(serde_json::json!([dir_json("c", "a/b/c")]).to_string())
            .create_async()
            .await;
        let beyond = server
            .mock("GET", "/repos/o/r/contents/a/b/c")
            .expect(0)
            .create_async()
            .await;

        let (crawler, _) = tracked_crawler(&server, 3).await;
        let tree = crawler.crawl("o", "r", 3, "a1").await.unwrap();

        fn max_depth_of(node: &TreeNode) -> u32 {
            node.max_depth()
        }
        assert!(max_depth_of(&tree) <= 3);

        let c = &tree.children.as_ref().unwrap()[0].children.as_ref().unwrap()[0]
            .children
            .as_ref()
            .unwrap()[0];
        assert_eq!(c.path.as_deref(), Some("a/b/c"));
        assert_eq!(c.depth_reached, 3);
        assert!(c.truncated);
        assert_eq!(c.children.as_deref(), Some(&[][..]));
        beyond.assert_async().await; // never listed past the bound
    }

    #[tokio::test]
    async fn denylisted_entries_never_appear() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/o/r/contents")
            .with_body(
                serde_json::json!([
                    dir_json("node_modules", "node_modules"),
                    dir_json(".git", ".git"),
                    file_json("package-lock.json", "package-lock.json", 9000),
                    file_json("app.min.js", "app.min.js", 5000),
                    file_json("index.js", "index.js", 100),
                ])
                .to_string(),
            )
            .create_async()
            .await;
        let skipped = server
            .mock("GET", "/repos/o/r/contents/node_modules")
            .expect(0)
            .create_async()
            .await;

        let (crawler, _) = tracked_crawler(&server, 5).await;
        let tree = crawler.crawl("o", "r", 5, "a1").await.unwrap();

        let children = tree.children.as_ref().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "index.js");
        skipped.assert_async().await;
    }

    #[tokio::test]
    async fn subdirectory_failure_is_contained() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/o/r/contents")
            .with_body(
                serde_json::json!([dir_json("secret", "secret"), file_json("ok.rs", "ok.rs", 1)])
                    .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/contents/secret")
            .with_status(403)
            .with_body(r#"{"message": "Forbidden"}"#)
            .create_async()
            .await;

        let (crawler, _) = tracked_crawler(&server, 5).await;
        let tree = crawler.crawl("o", "r", 5, "a1").await.unwrap();

        let children = tree.children.as_ref().unwrap();
        assert_eq!(children.len(), 2);
        let failed = &children[0];
        assert_eq!(failed.kind, NodeKind::Folder);
        assert!(failed.error.is_some());
        assert!(!failed.truncated);
        assert_eq!(children[1].name, "ok.rs");
    }

    #[tokio::test]
    async fn root_failure_aborts_the_crawl() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/o/r/contents")
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        let (crawler, _) = tracked_crawler(&server, 5).await;
        let err = crawler.crawl("o", "r", 5, "a1").await.unwrap_err();
        assert!(matches!(err, CrawlError::Upstream(_)));
    }

    #[tokio::test]
    async fn cancellation_stops_the_crawl() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/o/r/contents")
            .with_body(serde_json::json!([dir_json("a", "a")]).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/contents/a")
            .with_body(serde_json::json!([file_json("x.rs", "a/x.rs", 1)]).to_string())
            .create_async()
            .await;

        let (crawler, progress) = tracked_crawler(&server, 5).await;
        // Flag set before the crawl observes its first check point.
        progress.cancel("a1").await;

        let err = crawler.crawl("o", "r", 5, "a1").await.unwrap_err();
        assert!(matches!(err, CrawlError::Cancelled));
    }

    #[tokio::test]
    async fn progress_is_monotone_and_stays_inside_the_crawl_window() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/o/r/contents")
            .with_body(serde_json::json!([dir_json("a", "a")]).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/contents/a")
            .with_body(serde_json::json!([dir_json("b", "a/b")]).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/contents/a/b")
            .with_body(serde_json::json!([]).to_string())
            .create_async()
            .await;

        let (crawler, progress) = tracked_crawler(&server, 4).await;
        crawler.crawl("o", "r", 4, "a1").await.unwrap();

        let observed = progress.get("a1").await.unwrap();
        assert!(observed.percent_complete >= PROGRESS_FLOOR);
        assert!(observed.percent_complete <= PROGRESS_CEILING);
        assert_eq!(observed.current_path, "a/b");
    }
}
