pub mod analyzer;
pub mod crawler;
pub mod denylist;
pub mod llm;
pub mod progress;
pub mod reconciler;
pub mod storage;

pub use analyzer::{AnalysisError, AnalysisService, ANALYSES_COUNTER};
pub use crawler::{CrawlError, TreeCrawler};
pub use llm::{CodeAnalysis, LlmClient, LlmError};
pub use progress::ProgressStore;
pub use reconciler::{CountReconciler, RepoTotals};
pub use storage::{MemoryStorage, PgStorage, RepositoryStore, StorageError, UserStore};
