//! Live progress state for one in-flight crawl.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ephemeral per-crawl progress, owned by the progress store for the
/// lifetime of one analysis attempt. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlProgress {
    /// Unique per crawl attempt, scoped to the owning user.
    pub analysis_id: String,
    pub user_id: String,
    /// 0-100, monotonically non-decreasing within one crawl.
    pub percent_complete: u8,
    pub current_depth: u32,
    pub max_depth: u32,
    /// Last path visited, for UI display.
    pub current_path: String,
    /// One-way flag: once set it is never cleared.
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
}

impl CrawlProgress {
    pub fn new(analysis_id: String, user_id: String, max_depth: u32) -> Self {
        Self {
            analysis_id,
            user_id,
            percent_complete: 0,
            current_depth: 0,
            max_depth,
            current_path: String::new(),
            cancelled: false,
            started_at: Utc::now(),
        }
    }
}
