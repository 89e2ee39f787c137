//! SQLite-backed contact store.
//!
//! One row per record key, the record itself stored as JSON and the expiry as
//! epoch milliseconds. Expired rows are filtered out in SQL rather than
//! deleted; the next write under the same key replaces them. The schema
//! migration is embedded via `include_str!` and applied on open.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::debug;

use super::store::ContactStore;
use super::{ContactRecord, StoreError};

/// Durable contact store backed by SQLite.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the store database at `path` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the parent directory cannot be created, the
    /// database cannot be opened, or the migration fails.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!(
                    "failed to create store directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .pragma("trusted_schema", "OFF")
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await?;

        let migration_sql = include_str!("../../migrations/001_contact_schema.sql");
        sqlx::raw_sql(migration_sql).execute(&pool).await?;

        debug!(path = %path.display(), "contact store schema applied");
        Ok(Self { pool })
    }

    /// The underlying pool, for maintenance queries in tests.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ContactStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<ContactRecord>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT record_json FROM contact_records \
             WHERE record_key = ?1 AND expires_at > ?2",
        )
        .bind(key)
        .bind(Utc::now().timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &str,
        record: &ContactRecord,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        sqlx::query(
            "INSERT INTO contact_records (record_key, record_json, expires_at) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT(record_key) DO UPDATE SET \
                 record_json = ?2, \
                 expires_at = ?3, \
                 updated_at = datetime('now')",
        )
        .bind(key)
        .bind(&json)
        .bind(expires_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
