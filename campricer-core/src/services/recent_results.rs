//! Durable recent-results history
//!
//! Order-preserving, size-bounded log of every accepted recognition result.
//! Persistence is write-through: each mutation rewrites the whole stored
//! array before returning, so the blob and the in-memory list converge by
//! the end of every call. A failed write is logged and the in-memory list
//! stays authoritative for the rest of the session.

use crate::services::result_store::release_asset;
use campricer_common::events::{EventBus, PricerEvent};
use campricer_common::storage::{KvStore, RECENT_RESULTS_KEY};
use campricer_common::types::{CameraRecord, HistoryEntry};
use chrono::Utc;

/// Hard cap on stored history entries; oldest evicted first
pub const MAX_RECENT_RESULTS: usize = 1000;

/// Durable store of recent recognition results
pub struct RecentResultsStore {
    store: KvStore,
    event_bus: EventBus,
    entries: Vec<HistoryEntry>,
}

impl RecentResultsStore {
    /// Load history from durable storage
    ///
    /// Missing or corrupt data initializes an empty list; startup never
    /// fails on a bad blob.
    pub async fn load(store: KvStore, event_bus: EventBus) -> Self {
        let entries = match store.get(RECENT_RESULTS_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<Vec<HistoryEntry>>(value) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(error = %e, "recent results blob is corrupt, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read recent results, starting empty");
                Vec::new()
            }
        };
        tracing::info!(entries = entries.len(), "recent results loaded");
        Self {
            store,
            event_bus,
            entries,
        }
    }

    /// Stored entries, newest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Accept a record into history, evicting past the cap, and persist
    pub async fn append(&mut self, record: &CameraRecord) -> HistoryEntry {
        let entry = HistoryEntry::from_record(record);
        self.entries.insert(0, entry.clone());

        while self.entries.len() > MAX_RECENT_RESULTS {
            if let Some(evicted) = self.entries.pop() {
                tracing::debug!(entry_id = %evicted.id, "evicted oldest history entry");
                self.event_bus
                    .emit(PricerEvent::HistoryEvicted {
                        entry_id: evicted.id,
                        timestamp: Utc::now(),
                    })
                    .ok();
            }
        }

        self.persist().await;
        entry
    }

    /// Remove one entry by id, deleting its image asset first
    ///
    /// Returns false when no entry has the given id.
    pub async fn remove(&mut self, id: &str) -> bool {
        let Some(position) = self.entries.iter().position(|e| e.id == id) else {
            return false;
        };
        if let Some(image) = self.entries[position].image_uri.clone() {
            release_asset(&image).await;
        }
        let entry = self.entries.remove(position);
        self.persist().await;
        self.event_bus
            .emit(PricerEvent::HistoryRemoved {
                entry_id: entry.id,
                timestamp: Utc::now(),
            })
            .ok();
        true
    }

    /// Drop all history, removing the storage key entirely
    pub async fn clear(&mut self) {
        self.entries.clear();
        if let Err(e) = self.store.remove(RECENT_RESULTS_KEY).await {
            tracing::warn!(error = %e, "failed to remove recent results key");
        }
        self.event_bus
            .emit(PricerEvent::HistoryCleared {
                timestamp: Utc::now(),
            })
            .ok();
    }

    async fn persist(&self) {
        let value = match serde_json::to_value(&self.entries) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode recent results");
                return;
            }
        };
        if let Err(e) = self.store.set(RECENT_RESULTS_KEY, &value).await {
            tracing::warn!(error = %e, "failed to persist recent results");
        }
    }
}
