//! Key-value blob storage.
//!
//! [`KvStore`] is the narrow durable-storage contract the memory layer
//! depends on: get/set/delete of string payloads under string keys.
//! [`SqliteKvStore`] persists to the `kv_store` table; [`InMemoryKvStore`]
//! keeps everything in process memory.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

/// Scoped key → string blob store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get a value by key, returning `None` if not found.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Set a value for a key (insert or replace).
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete a key, returning `true` if it existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;
}

// ═══════════════════════════════════════════════════════════════════════
//  SQLite-backed store
// ═══════════════════════════════════════════════════════════════════════

/// Persistent key-value store on the `kv_store` table.
#[derive(Clone)]
pub struct SqliteKvStore {
    db: Database,
}

impl SqliteKvStore {
    /// Create a store backed by `db`. Migrations must already have run.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let key = key.to_string();
        self.db
            .execute(move |conn| {
                let result = conn.query_row(
                    "SELECT value FROM kv_store WHERE key = ?1",
                    rusqlite::params![key],
                    |row| row.get(0),
                );
                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        let now = chrono::Utc::now().timestamp();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3) \
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
                     updated_at = excluded.updated_at",
                    rusqlite::params![key, value, now],
                )?;
                debug!(key = %key, "kv value stored");
                Ok(())
            })
            .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let key = key.to_string();
        self.db
            .execute(move |conn| {
                let deleted =
                    conn.execute("DELETE FROM kv_store WHERE key = ?1", rusqlite::params![key])?;
                Ok(deleted > 0)
            })
            .await
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  In-memory store
// ═══════════════════════════════════════════════════════════════════════

/// Process-local key-value store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryKvStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| StoreError::TaskJoin(format!("mutex poisoned: {e}")))
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.lock()?.remove(key).is_some())
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    async fn sqlite_store() -> SqliteKvStore {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        SqliteKvStore::new(db)
    }

    #[tokio::test]
    async fn get_nonexistent_returns_none() {
        let store = sqlite_store().await;
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_overwrites() {
        let store = sqlite_store().await;
        store.set("key1", "old").await.unwrap();
        store.set("key1", "new").await.unwrap();
        assert_eq!(store.get("key1").await.unwrap(), Some("new".to_string()));
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = sqlite_store().await;
        store.set("key1", "val").await.unwrap();
        assert!(store.delete("key1").await.unwrap());
        assert!(!store.delete("key1").await.unwrap());
        assert!(store.get("key1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn large_payload_round_trips() {
        let store = sqlite_store().await;
        let payload = "x".repeat(2 * 1024 * 1024);
        store.set("big", &payload).await.unwrap();
        assert_eq!(store.get("big").await.unwrap().unwrap().len(), payload.len());
    }

    #[tokio::test]
    async fn in_memory_store_contract() {
        let store = InMemoryKvStore::new();
        assert!(store.is_empty().unwrap());

        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
        assert_eq!(store.len().unwrap(), 1);

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn poisoned_lock_is_an_error_everywhere() {
        let store = Arc::new(InMemoryKvStore::new());
        store.set("k", "v").await.unwrap();

        let poisoner = Arc::clone(&store);
        let joined = std::thread::spawn(move || {
            let _guard = poisoner.entries.lock().unwrap();
            panic!("poison the store lock");
        })
        .join();
        assert!(joined.is_err());

        assert!(store.len().is_err());
        assert!(store.is_empty().is_err());
        assert!(store.get("k").await.is_err());
        assert!(store.set("k", "w").await.is_err());
        assert!(store.delete("k").await.is_err());
    }
}
