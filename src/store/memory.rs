//! In-memory store with optional JSON snapshot persistence.

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::store::{
    Collection, CollectionItem, CollectionItemInput, DataStore, HistoryEntry, StoreError,
};

/// On-disk layout of a snapshot.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    history: Vec<HistoryEntry>,
    collections: Vec<Collection>,
}

/// A thread-safe store keyed by user (history) and by id (collections).
#[derive(Clone, Default)]
pub struct MemoryStore {
    history: Arc<DashMap<String, Vec<HistoryEntry>>>,
    collections: Arc<DashMap<Uuid, Collection>>,
    persistence_path: Option<String>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new(persistence_path: Option<String>) -> Self {
        Self {
            history: Arc::new(DashMap::new()),
            collections: Arc::new(DashMap::new()),
            persistence_path,
        }
    }

    /// Load from file if it exists; the same path is used by `flush`.
    pub fn load_from_file(path: &str) -> std::io::Result<Self> {
        let store = Self::new(Some(path.to_string()));
        if Path::new(path).exists() {
            let reader = BufReader::new(File::open(path)?);
            let snapshot: Snapshot = serde_json::from_reader(reader)?;

            for entry in snapshot.history {
                store.history.entry(entry.user.clone()).or_default().push(entry);
            }
            for collection in snapshot.collections {
                store.collections.insert(collection.id, collection);
            }
            tracing::info!(
                history_users = store.history.len(),
                collections = store.collections.len(),
                "Loaded store snapshot"
            );
        }
        Ok(store)
    }

    /// Save to file.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        if let Some(path) = &self.persistence_path {
            let snapshot = Snapshot {
                history: self.history.iter().flat_map(|r| r.value().clone()).collect(),
                collections: self.collections.iter().map(|r| r.value().clone()).collect(),
            };
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer(writer, &snapshot)?;
            tracing::info!(
                history = snapshot.history.len(),
                collections = snapshot.collections.len(),
                "Saved store snapshot"
            );
        }
        Ok(())
    }

    fn owned_mut(
        &self,
        user: &str,
        id: Uuid,
    ) -> Result<dashmap::mapref::one::RefMut<'_, Uuid, Collection>, StoreError> {
        let collection = self.collections.get_mut(&id).ok_or(StoreError::NotFound)?;
        if collection.user != user {
            return Err(StoreError::NotOwner);
        }
        Ok(collection)
    }
}

impl DataStore for MemoryStore {
    fn recent_history(&self, user: &str, limit: usize) -> Vec<HistoryEntry> {
        let mut entries = self
            .history
            .get(user)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);
        entries
    }

    fn add_history(&self, entry: HistoryEntry) -> HistoryEntry {
        self.history
            .entry(entry.user.clone())
            .or_default()
            .push(entry.clone());
        entry
    }

    fn clear_history(&self, user: &str) -> usize {
        self.history.remove(user).map(|(_, v)| v.len()).unwrap_or(0)
    }

    fn list_collections(&self, user: &str) -> Vec<Collection> {
        let mut out: Vec<Collection> = self
            .collections
            .iter()
            .filter(|r| r.value().user == user)
            .map(|r| r.value().clone())
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        out
    }

    fn create_collection(&self, user: &str, name: String) -> Collection {
        let now = Utc::now();
        let collection = Collection {
            id: Uuid::new_v4(),
            user: user.to_string(),
            name,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.collections.insert(collection.id, collection.clone());
        collection
    }

    fn delete_collection(&self, user: &str, id: Uuid) -> Result<(), StoreError> {
        drop(self.owned_mut(user, id)?);
        self.collections.remove(&id);
        Ok(())
    }

    fn add_collection_item(
        &self,
        user: &str,
        id: Uuid,
        item: CollectionItemInput,
    ) -> Result<Collection, StoreError> {
        let mut collection = self.owned_mut(user, id)?;
        collection.items.push(CollectionItem::from(item));
        collection.updated_at = Utc::now();
        Ok(collection.clone())
    }

    fn flush(&self) -> std::io::Result<()> {
        self.save_to_file()
    }
}
