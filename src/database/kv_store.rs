//! Whole-value key-value stores.
//!
//! The store primitive is full-value replacement: `set` overwrites the value
//! of each key it is given, there is no element- or field-level mutation.
//! Every committed change is broadcast to `on_changed` subscribers, which is
//! how other contexts learn that a bookmark list moved under them.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, OptionalExtension};
use tokio::sync::broadcast;
use tracing::debug;

use super::connection::Database;
use crate::types::errors::StorageError;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// One committed change to a key.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Asynchronous whole-value key-value store shared by every context.
pub trait KeyValueStore: Send + Sync {
    /// Reads the values of `keys`. Absent keys are simply missing from the map.
    fn get(&self, keys: &[&str]) -> impl Future<Output = Result<HashMap<String, String>, StorageError>> + Send;

    /// Replaces the value of every key in `entries`.
    fn set(&self, entries: HashMap<String, String>) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Subscribes to committed changes from any writer.
    fn on_changed(&self) -> broadcast::Receiver<StorageChange>;
}

fn publish(changes: &broadcast::Sender<StorageChange>, committed: Vec<StorageChange>) {
    for change in committed {
        // No subscribers is fine; the value is already durable.
        if changes.send(change).is_err() {
            debug!("storage change dropped: no subscribers");
        }
    }
}

/// SQLite-backed store, one row per key in `kv_entries`.
pub struct SqliteKvStore {
    db: Mutex<Database>,
    changes: broadcast::Sender<StorageChange>,
}

impl SqliteKvStore {
    /// Opens (or creates) the store at `path`.
    ///
    /// # Errors
    /// Returns `StorageError::DatabaseError` if the database cannot be opened or migrated.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Ok(Self::from_database(Database::open(path)?))
    }

    /// Opens a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    pub fn from_database(db: Database) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            db: Mutex::new(db),
            changes,
        }
    }

    fn read(&self, keys: &[&str]) -> Result<HashMap<String, String>, StorageError> {
        let db = self
            .db
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let mut stmt = db
            .connection()
            .prepare("SELECT value FROM kv_entries WHERE key = ?1")?;

        let mut values = HashMap::new();
        for key in keys {
            let value: Option<String> = stmt
                .query_row(params![key], |row| row.get(0))
                .optional()?;
            if let Some(v) = value {
                values.insert(key.to_string(), v);
            }
        }
        Ok(values)
    }

    fn write(&self, entries: HashMap<String, String>) -> Result<Vec<StorageChange>, StorageError> {
        let mut db = self
            .db
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let now = chrono::Utc::now().timestamp();

        db.write_transaction(|tx| {
            let mut committed = Vec::new();
            for (key, value) in entries {
                let old: Option<String> = tx
                    .query_row(
                        "SELECT value FROM kv_entries WHERE key = ?1",
                        params![key],
                        |row| row.get(0),
                    )
                    .optional()?;
                if old.as_deref() == Some(value.as_str()) {
                    continue;
                }
                tx.execute(
                    "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    params![key, value, now],
                )?;
                committed.push(StorageChange {
                    key,
                    old_value: old,
                    new_value: Some(value),
                });
            }
            Ok(committed)
        })
    }
}

impl KeyValueStore for SqliteKvStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, String>, StorageError> {
        self.read(keys)
    }

    async fn set(&self, entries: HashMap<String, String>) -> Result<(), StorageError> {
        let committed = self.write(entries)?;
        publish(&self.changes, committed);
        Ok(())
    }

    fn on_changed(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}

/// In-process store with the same contract, for previews and tests.
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
    changes: broadcast::Sender<StorageChange>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            entries: Mutex::new(HashMap::new()),
            changes,
        }
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryKvStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, String>, StorageError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(keys
            .iter()
            .filter_map(|k| entries.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, entries: HashMap<String, String>) -> Result<(), StorageError> {
        let committed = {
            let mut current = self
                .entries
                .lock()
                .map_err(|e| StorageError::Unavailable(e.to_string()))?;
            let mut committed = Vec::new();
            for (key, value) in entries {
                let old = current.insert(key.clone(), value.clone());
                if old.as_deref() != Some(value.as_str()) {
                    committed.push(StorageChange {
                        key,
                        old_value: old,
                        new_value: Some(value),
                    });
                }
            }
            committed
        };
        publish(&self.changes, committed);
        Ok(())
    }

    fn on_changed(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
