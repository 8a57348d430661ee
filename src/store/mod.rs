//! History and collection storage.
//!
//! # Data Flow
//! ```text
//! http handlers (authenticated caller)
//!     → DataStore trait (owner-scoped operations)
//!     → memory.rs (DashMap, optional JSON snapshot)
//! ```
//!
//! # Design Decisions
//! - Every operation is scoped to the caller's user id
//! - Ownership violations are distinct from missing records
//! - Operations are synchronous; the backing maps never block for long

pub mod memory;
pub mod types;

pub use memory::MemoryStore;
pub use types::{
    Collection, CollectionItem, CollectionItemInput, HistoryEntry, HistoryInput, KeyValue,
    RecordedResponse,
};

use thiserror::Error;
use uuid::Uuid;

/// Number of history entries returned by a listing.
pub const HISTORY_PAGE: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Collection not found")]
    NotFound,
    #[error("User not authorized")]
    NotOwner,
}

/// Persistence interface for per-user history and collections.
pub trait DataStore: Send + Sync {
    /// Newest first, at most `limit` entries.
    fn recent_history(&self, user: &str, limit: usize) -> Vec<HistoryEntry>;

    fn add_history(&self, entry: HistoryEntry) -> HistoryEntry;

    /// Returns the number of entries removed.
    fn clear_history(&self, user: &str) -> usize;

    /// Oldest first.
    fn list_collections(&self, user: &str) -> Vec<Collection>;

    fn create_collection(&self, user: &str, name: String) -> Collection;

    fn delete_collection(&self, user: &str, id: Uuid) -> Result<(), StoreError>;

    fn add_collection_item(
        &self,
        user: &str,
        id: Uuid,
        item: CollectionItemInput,
    ) -> Result<Collection, StoreError>;

    /// Persist state, if the store is backed by anything durable.
    fn flush(&self) -> std::io::Result<()> {
        Ok(())
    }
}
