//! Persistence layer
//!
//! Capability traits for user and analysis storage, with two backends
//! selected once at startup: `PgStorage` (durable, the production path)
//! and `MemoryStorage` (tests and an explicit opt-in mode). No per-call
//! branching on the backend anywhere else in the codebase.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{AnalysisStats, RepositoryRecord, TreeNode, User};

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The row does not exist, or belongs to another user. The message is
    /// identical either way so existence is not revealed.
    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn record_not_found(record_id: &str) -> StorageError {
    StorageError::NotFound(format!("Analysis not found: {record_id}"))
}

/// User account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<(), StorageError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StorageError>;
    async fn delete_user(&self, user_id: &str) -> Result<(), StorageError>;
}

/// Saved-analysis storage plus the global counters table.
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    /// Write one immutable record. Re-analysis inserts a new record.
    async fn insert_record(&self, record: &RepositoryRecord) -> Result<(), StorageError>;

    /// All records owned by a user, newest first.
    async fn list_records(&self, user_id: &str) -> Result<Vec<RepositoryRecord>, StorageError>;

    async fn get_record(
        &self,
        user_id: &str,
        record_id: &str,
    ) -> Result<Option<RepositoryRecord>, StorageError>;

    /// Owner-scoped delete. Fails closed: another user's record id reports
    /// `NotFound` without revealing existence.
    async fn delete_record(&self, user_id: &str, record_id: &str) -> Result<(), StorageError>;

    /// Best-effort bulk delete used by account deletion. Returns the
    /// number of records removed.
    async fn delete_records_for_user(&self, user_id: &str) -> Result<u64, StorageError>;

    async fn increment_counter(&self, name: &str) -> Result<i64, StorageError>;
    async fn get_counter(&self, name: &str) -> Result<i64, StorageError>;
}

// ============================================================================
// PostgreSQL backend
// ============================================================================

/// Durable storage on PostgreSQL. Trees and stats are stored as JSONB.
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    record_id: String,
    user_id: String,
    repo_url: String,
    owner: String,
    repo: String,
    tree: sqlx::types::Json<TreeNode>,
    stats: sqlx::types::Json<AnalysisStats>,
    created_at: DateTime<Utc>,
}

impl From<RecordRow> for RepositoryRecord {
    fn from(row: RecordRow) -> Self {
        Self {
            record_id: row.record_id,
            user_id: row.user_id,
            repo_url: row.repo_url,
            owner: row.owner,
            repo: row.repo,
            tree: row.tree.0,
            stats: row.stats.0,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl UserStore for PgStorage {
    async fn insert_user(&self, user: &User) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO users (user_id, display_name, email, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&user.user_id)
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            "SELECT user_id, display_name, email, created_at FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| User {
            user_id: row.get("user_id"),
            display_name: row.get("display_name"),
            email: row.get("email"),
            created_at: row.get("created_at"),
        }))
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("User not found: {user_id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl RepositoryStore for PgStorage {
    async fn insert_record(&self, record: &RepositoryRecord) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO repository_records \
             (record_id, user_id, repo_url, owner, repo, tree, stats, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&record.record_id)
        .bind(&record.user_id)
        .bind(&record.repo_url)
        .bind(&record.owner)
        .bind(&record.repo)
        .bind(sqlx::types::Json(&record.tree))
        .bind(sqlx::types::Json(&record.stats))
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_records(&self, user_id: &str) -> Result<Vec<RepositoryRecord>, StorageError> {
        let rows = sqlx::query_as::<_, RecordRow>(
            "SELECT record_id, user_id, repo_url, owner, repo, tree, stats, created_at \
             FROM repository_records WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RepositoryRecord::from).collect())
    }

    async fn get_record(
        &self,
        user_id: &str,
        record_id: &str,
    ) -> Result<Option<RepositoryRecord>, StorageError> {
        let row = sqlx::query_as::<_, RecordRow>(
            "SELECT record_id, user_id, repo_url, owner, repo, tree, stats, created_at \
             FROM repository_records WHERE user_id = $1 AND record_id = $2",
        )
        .bind(user_id)
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RepositoryRecord::from))
    }

    async fn delete_record(&self, user_id: &str, record_id: &str) -> Result<(), StorageError> {
        let result =
            sqlx::query("DELETE FROM repository_records WHERE user_id = $1 AND record_id = $2")
                .bind(user_id)
                .bind(record_id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(record_not_found(record_id));
        }
        Ok(())
    }

    async fn delete_records_for_user(&self, user_id: &str) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM repository_records WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn increment_counter(&self, name: &str) -> Result<i64, StorageError> {
        let row = sqlx::query(
            "INSERT INTO counters (name, value) VALUES ($1, 1) \
             ON CONFLICT (name) DO UPDATE SET value = counters.value + 1 \
             RETURNING value",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("value"))
    }

    async fn get_counter(&self, name: &str) -> Result<i64, StorageError> {
        let row = sqlx::query("SELECT value FROM counters WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get("value")).unwrap_or(0))
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// In-memory storage used by tests and the explicit `memory` backend mode.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    users: RwLock<HashMap<String, User>>,
    records: RwLock<Vec<RepositoryRecord>>,
    counters: RwLock<HashMap<String, i64>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStorage {
    async fn insert_user(&self, user: &User) -> Result<(), StorageError> {
        let mut users = self.users.write().await;
        users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StorageError> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), StorageError> {
        let mut users = self.users.write().await;
        users
            .remove(user_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("User not found: {user_id}")))
    }
}

#[async_trait]
impl RepositoryStore for MemoryStorage {
    async fn insert_record(&self, record: &RepositoryRecord) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        records.push(record.clone());
        Ok(())
    }

    async fn list_records(&self, user_id: &str) -> Result<Vec<RepositoryRecord>, StorageError> {
        let records = self.records.read().await;
        let mut owned: Vec<RepositoryRecord> = records
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn get_record(
        &self,
        user_id: &str,
        record_id: &str,
    ) -> Result<Option<RepositoryRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|r| r.user_id == user_id && r.record_id == record_id)
            .cloned())
    }

    async fn delete_record(&self, user_id: &str, record_id: &str) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !(r.user_id == user_id && r.record_id == record_id));
        if records.len() == before {
            return Err(record_not_found(record_id));
        }
        Ok(())
    }

    async fn delete_records_for_user(&self, user_id: &str) -> Result<u64, StorageError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.user_id != user_id);
        Ok((before - records.len()) as u64)
    }

    async fn increment_counter(&self, name: &str) -> Result<i64, StorageError> {
        let mut counters = self.counters.write().await;
        let value = counters.entry(name.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn get_counter(&self, name: &str) -> Result<i64, StorageError> {
        let counters = self.counters.read().await;
        Ok(counters.get(name).copied().unwrap_or(0))
    }
}
