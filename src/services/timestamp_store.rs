//! Timestamp Store for Vidmarks.
//!
//! Typed persistence for per-video bookmark lists on top of a whole-value
//! [`KeyValueStore`]. Every mutation is read-modify-write of the full list:
//! re-read right before writing, apply the change, re-sort, write the whole
//! list back. Concurrent writers in other contexts can still race between the
//! read and the write; the last write wins.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::database::kv_store::{KeyValueStore, StorageChange};
use crate::services::lifecycle_guard::{LifecycleGuard, SessionHandle};
use crate::types::bookmark::{sort_by_time, Bookmark, ContentId};
use crate::types::errors::StoreError;

/// Two times closer than this address the same bookmark.
///
/// Times round-trip through JSON text and UI code, so exact float equality
/// would let deletes silently miss.
pub const TIME_MATCH_TOLERANCE: f64 = 1e-6;

/// Decodes a persisted list.
pub fn decode_list(raw: &str) -> Result<Vec<Bookmark>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Encodes a list for persistence.
pub fn encode_list(bookmarks: &[Bookmark]) -> Result<String, serde_json::Error> {
    serde_json::to_string(bookmarks)
}

/// Bookmark persistence gated by the session handle.
pub struct TimestampStore<S: KeyValueStore> {
    store: Arc<S>,
    session: SessionHandle,
}

impl<S: KeyValueStore> Clone for TimestampStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            session: self.session.clone(),
        }
    }
}

impl<S: KeyValueStore + 'static> TimestampStore<S> {
    pub fn new(store: Arc<S>, session: SessionHandle) -> Self {
        Self { store, session }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Returns the persisted list for `id`.
    ///
    /// Never fails: an invalid session, an unreadable store, a missing key or
    /// an undecodable value all yield an empty list.
    pub async fn fetch(&self, id: &ContentId) -> Vec<Bookmark> {
        if !self.session.is_valid() {
            debug!(video = %id, "fetch skipped: session invalid");
            return Vec::new();
        }

        let values = match self.store.get(&[id.as_str()]).await {
            Ok(values) => values,
            Err(e) => {
                warn!(video = %id, error = %e, "bookmark fetch failed");
                return Vec::new();
            }
        };

        match values.get(id.as_str()) {
            None => Vec::new(),
            Some(raw) => decode_list(raw).unwrap_or_else(|e| {
                warn!(video = %id, error = %e, "stored bookmarks could not be decoded");
                Vec::new()
            }),
        }
    }

    /// Appends `bookmark` to the freshly read list and writes it back sorted.
    ///
    /// Returns the list as written.
    ///
    /// # Errors
    /// `SessionInvalid`, `StoreUnavailable` or `Corrupt`; the stored value is
    /// left untouched in every error case.
    pub async fn append(&self, id: &ContentId, bookmark: Bookmark) -> Result<Vec<Bookmark>, StoreError> {
        let mut bookmarks = self.read_list(id).await?;
        bookmarks.push(bookmark);
        sort_by_time(&mut bookmarks);
        self.write_list(id, &bookmarks).await?;
        debug!(video = %id, count = bookmarks.len(), "bookmark appended");
        Ok(bookmarks)
    }

    /// Removes the first bookmark whose time matches `time`.
    ///
    /// # Errors
    /// `NotFound` when nothing matches, in which case nothing is written.
    pub async fn remove_one(&self, id: &ContentId, time: f64) -> Result<Vec<Bookmark>, StoreError> {
        let mut bookmarks = self.read_list(id).await?;
        let position = bookmarks
            .iter()
            .position(|b| (b.time - time).abs() <= TIME_MATCH_TOLERANCE);

        let Some(index) = position else {
            debug!(video = %id, time, "no bookmark to remove");
            return Err(StoreError::NotFound(time));
        };

        bookmarks.remove(index);
        self.write_list(id, &bookmarks).await?;
        debug!(video = %id, time, "bookmark removed");
        Ok(bookmarks)
    }

    /// Replaces the list for `id` with an empty one, whatever it held.
    pub async fn remove_all(&self, id: &ContentId) -> Result<(), StoreError> {
        self.write_list(id, &[]).await?;
        debug!(video = %id, "bookmarks cleared");
        Ok(())
    }

    /// Subscribes to list changes written by any context.
    pub fn subscribe(&self) -> BookmarkChanges {
        BookmarkChanges {
            rx: self.store.on_changed(),
        }
    }

    /// Spawns a listener that calls `callback(id, new_list)` for every change.
    ///
    /// The callback is expected to filter for the id it cares about. The task
    /// ends when the store is dropped.
    pub fn on_external_change<F>(&self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(ContentId, Vec<Bookmark>) + Send + 'static,
    {
        let mut changes = self.subscribe();
        tokio::spawn(async move {
            while let Some((id, bookmarks)) = changes.next().await {
                callback(id, bookmarks);
            }
        })
    }

    async fn read_list(&self, id: &ContentId) -> Result<Vec<Bookmark>, StoreError> {
        if !self.session.is_valid() {
            return Err(StoreError::SessionInvalid);
        }
        let values = self.store.get(&[id.as_str()]).await?;
        match values.get(id.as_str()) {
            None => Ok(Vec::new()),
            Some(raw) => decode_list(raw).map_err(|e| {
                warn!(video = %id, error = %e, "refusing to overwrite undecodable bookmarks");
                StoreError::Corrupt(id.to_string())
            }),
        }
    }

    async fn write_list(&self, id: &ContentId, bookmarks: &[Bookmark]) -> Result<(), StoreError> {
        // Re-checked here as well: the read above may have suspended long enough
        // for the extension to be reloaded.
        if !self.session.is_valid() {
            return Err(StoreError::SessionInvalid);
        }
        let encoded = encode_list(bookmarks).map_err(|e| StoreError::StoreUnavailable(e.to_string()))?;
        let mut entries = HashMap::with_capacity(1);
        entries.insert(id.as_str().to_string(), encoded);
        self.store.set(entries).await.map_err(|e| {
            warn!(video = %id, error = %e, "bookmark save failed");
            StoreError::from(e)
        })
    }
}

/// Stream of decoded bookmark-list changes.
pub struct BookmarkChanges {
    rx: broadcast::Receiver<StorageChange>,
}

impl BookmarkChanges {
    /// Waits for the next decodable change. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<(ContentId, Vec<Bookmark>)> {
        loop {
            let change = match self.rx.recv().await {
                Ok(change) => change,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "bookmark change listener lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            };

            let Some(id) = ContentId::new(&change.key) else {
                continue;
            };
            let bookmarks = match change.new_value.as_deref() {
                None => Vec::new(),
                Some(raw) => match decode_list(raw) {
                    Ok(list) => list,
                    Err(e) => {
                        warn!(video = %id, error = %e, "ignoring undecodable change");
                        continue;
                    }
                },
            };
            return Some((id, bookmarks));
        }
    }
}
