//! The contact store trait and the in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{ContactRecord, StoreError};

/// Keyed record store with absolute expiry.
///
/// `get` must treat an expired entry as absent. `put` replaces any existing
/// entry under the key, expiry stamp included.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Fetch the record under `key`, honoring expiry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<ContactRecord>, StoreError>;

    /// Write `record` under `key` with an absolute expiry stamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be written.
    async fn put(
        &self,
        key: &str,
        record: &ContactRecord,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
struct StoredEntry {
    record: ContactRecord,
    expires_at: DateTime<Utc>,
}

/// HashMap-backed store for tests and short-lived harness runs.
///
/// Expired entries are dropped lazily on the next read of their key.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContactStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<ContactRecord>, StoreError> {
        let mut entries = self.entries.write().await;
        let expired = entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= Utc::now());
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|entry| entry.record.clone()))
    }

    async fn put(
        &self,
        key: &str,
        record: &ContactRecord,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.entries.write().await.insert(
            key.to_owned(),
            StoredEntry {
                record: record.clone(),
                expires_at,
            },
        );
        Ok(())
    }
}
