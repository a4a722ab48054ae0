//! Progress Store
//!
//! In-process keyed table mapping an analysis id to its live crawl
//! progress. Written by the crawler, read by the poll endpoint, flagged by
//! the cancel endpoint. Explicitly injected (held in `AppState`, passed to
//! services) so tests run against isolated instances. Not durable: a
//! process restart loses in-flight entries along with the requests that
//! were driving them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::CrawlProgress;

/// Shared progress table. Cloning is cheap and shares the same table.
#[derive(Debug, Clone, Default)]
pub struct ProgressStore {
    inner: Arc<RwLock<HashMap<String, CrawlProgress>>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new crawl. Replaces any stale entry under the same id.
    pub async fn insert(&self, progress: CrawlProgress) {
        let mut table = self.inner.write().await;
        table.insert(progress.analysis_id.clone(), progress);
    }

    pub async fn get(&self, analysis_id: &str) -> Option<CrawlProgress> {
        let table = self.inner.read().await;
        table.get(analysis_id).cloned()
    }

    /// Record crawl advancement. `percent_complete` never regresses: a
    /// lower value than the current one is clamped up to it.
    pub async fn update(
        &self,
        analysis_id: &str,
        percent_complete: u8,
        current_depth: u32,
        current_path: &str,
    ) {
        let mut table = self.inner.write().await;
        if let Some(entry) = table.get_mut(analysis_id) {
            entry.percent_complete = entry.percent_complete.max(percent_complete.min(100));
            entry.current_depth = current_depth;
            entry.current_path = current_path.to_string();
        }
    }

    /// Mark the crawl finished. Monotonicity still holds: 100 is terminal.
    pub async fn complete(&self, analysis_id: &str) {
        let mut table = self.inner.write().await;
        if let Some(entry) = table.get_mut(analysis_id) {
            entry.percent_complete = 100;
        }
    }

    /// Request cancellation. One-way: the flag is never reset to false.
    /// Returns false when no such crawl is in flight.
    pub async fn cancel(&self, analysis_id: &str) -> bool {
        let mut table = self.inner.write().await;
        match table.get_mut(analysis_id) {
            Some(entry) => {
                entry.cancelled = true;
                true
            }
            None => false,
        }
    }

    /// Cooperative cancellation check point for the crawler.
    pub async fn is_cancelled(&self, analysis_id: &str) -> bool {
        let table = self.inner.read().await;
        table.get(analysis_id).map(|e| e.cancelled).unwrap_or(true)
    }

    /// Drop the entry once the owning crawl terminates by any path.
    pub async fn remove(&self, analysis_id: &str) -> Option<CrawlProgress> {
        let mut table = self.inner.write().await;
        table.remove(analysis_id)
    }
}
