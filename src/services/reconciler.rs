//! Count Reconciler
//!
//! Computes true whole-repository totals from a single flattened listing,
//! independent of any crawl depth bound, so results can report
//! "analyzed N of Total" and detect truncation. Uses the same denylist as
//! the crawler, so both sides count the same universe of paths.

use tracing::warn;

use crate::github::{GitHubClient, GitHubError};
use crate::models::TreeNode;
use crate::services::denylist;

/// True totals for an entire repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoTotals {
    pub total_files: u64,
    pub total_folders: u64,
    pub max_depth: u32,
    pub total_size_bytes: u64,
}

/// Whole-repository counting pass, decoupled from the bounded crawl.
#[derive(Debug, Clone)]
pub struct CountReconciler {
    github: GitHubClient,
}

impl CountReconciler {
    pub fn new(github: GitHubClient) -> Self {
        Self { github }
    }

    /// Totals from `GET git/trees/{branch}?recursive=1`, denylist applied.
    /// Always at least as large as what a depth-bounded crawl materialized.
    pub async fn totals(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<RepoTotals, GitHubError> {
        let flat = self.github.flat_tree(owner, repo, branch).await?;
        if flat.truncated {
            warn!(%owner, %repo, "flattened listing truncated upstream; totals are a lower bound");
        }

        let mut totals = RepoTotals {
            total_files: 0,
            total_folders: 0,
            max_depth: 0,
            total_size_bytes: 0,
        };

        for entry in &flat.tree {
            let is_dir = entry.is_tree();
            if !is_dir && !entry.is_blob() {
                continue; // submodules
            }
            if denylist::is_noise_path(&entry.path, is_dir) {
                continue;
            }

            let depth = entry.path.split('/').count() as u32;
            totals.max_depth = totals.max_depth.max(depth);
            if is_dir {
                totals.total_folders += 1;
            } else {
                totals.total_files += 1;
                totals.total_size_bytes += entry.size.unwrap_or(0);
            }
        }

        Ok(totals)
    }

    /// Fallback when the flattened listing fails: count whatever the
    /// bounded crawl produced. A strict underestimate of the repository,
    /// but it keeps the analysis from failing outright.
    pub fn totals_from_tree(tree: &TreeNode) -> RepoTotals {
        RepoTotals {
            total_files: tree.count_files(),
            total_folders: tree.count_folders(),
            max_depth: tree.max_depth(),
            total_size_bytes: tree.total_size(),
        }
    }
}
