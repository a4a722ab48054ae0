//! Durable analysis records and the request/response payloads of the
//! analysis endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tree::TreeNode;

/// Statistics attached to one completed analysis.
///
/// `analyzed_*` counts come from the depth-bounded tree the crawler
/// materialized; `total_*` figures come from the count reconciler and are
/// always at least as large.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    pub analyzed_files: u64,
    pub analyzed_folders: u64,
    pub total_files: u64,
    pub total_folders: u64,
    /// The depth bound the crawl ran with.
    pub analyzed_depth: u32,
    /// True maximum depth of the repository.
    pub total_depth: u32,
    pub total_size_bytes: u64,
    pub visibility: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub star_count: u64,
    pub fork_count: u64,
    pub last_analyzed: DateTime<Utc>,
}

/// Durable record of one completed analysis. Never mutated after
/// creation; re-analysis writes a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    pub record_id: String,
    pub user_id: String,
    pub repo_url: String,
    pub owner: String,
    pub repo: String,
    pub tree: TreeNode,
    pub stats: AnalysisStats,
    pub created_at: DateTime<Utc>,
}

/// Listing view of a record, without the (potentially large) tree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub record_id: String,
    pub repo_url: String,
    pub owner: String,
    pub repo: String,
    pub stats: AnalysisStats,
    pub created_at: DateTime<Utc>,
}

impl From<&RepositoryRecord> for RecordSummary {
    fn from(record: &RepositoryRecord) -> Self {
        Self {
            record_id: record.record_id.clone(),
            repo_url: record.repo_url.clone(),
            owner: record.owner.clone(),
            repo: record.repo.clone(),
            stats: record.stats.clone(),
            created_at: record.created_at,
        }
    }
}

/// Request payload for starting an analysis.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub url: String,
    #[serde(default)]
    pub max_depth: Option<u32>,
    /// Client-supplied id so progress can be polled and the crawl
    /// cancelled while this request is still running. Generated
    /// server-side when absent.
    #[serde(default)]
    pub analysis_id: Option<String>,
}

/// Response for a completed analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub analysis_id: String,
    pub record: RepositoryRecord,
    /// True when the repository is deeper than the requested bound.
    pub was_truncated: bool,
}

/// Request payload for validate-only.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub url: String,
}

/// Repository metadata surfaced by validation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedRepo {
    pub owner: String,
    pub repo: String,
    pub visibility: String,
    pub default_branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Size in kibibytes as reported by the upstream host.
    pub size_kib: u64,
    pub star_count: u64,
    pub fork_count: u64,
}
