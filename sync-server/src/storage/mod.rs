//! Storage layer for clubsync-server.
//!
//! Record bodies are stored as opaque JSON documents keyed by
//! `(collection, record_id)` - the server enforces no schema beyond the id.

mod sqlite;

pub use sqlite::SqliteStorage;

use crate::error::StorageError;
use async_trait::async_trait;
use sync_types::{Collection, RecordId, Snapshot};

/// A record as stored by the server.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// Collection this record belongs to.
    pub collection: Collection,
    /// Record identifier.
    pub record_id: RecordId,
    /// The JSON record body (no client-local fields).
    pub payload: serde_json::Value,
    /// Unix timestamp of the last write.
    pub updated_at: i64,
}

/// Trait for record storage backends.
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Get all records of a collection, in insertion order.
    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StorageError>;

    /// Get a specific record.
    async fn get(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<Option<StoredRecord>, StorageError>;

    /// Insert or replace a record body.
    ///
    /// Returns the stored record.
    async fn upsert(
        &self,
        collection: Collection,
        id: RecordId,
        payload: serde_json::Value,
    ) -> Result<StoredRecord, StorageError>;

    /// Delete a record.
    ///
    /// Returns `true` if a record was deleted. Deleting a missing record is
    /// not an error.
    async fn delete(&self, collection: Collection, id: &RecordId) -> Result<bool, StorageError>;

    /// Replace every collection with the submitted snapshot, atomically.
    ///
    /// Returns the number of records stored.
    async fn replace_all(&self, snapshot: &Snapshot) -> Result<u64, StorageError>;

    /// Number of records in one collection.
    async fn count(&self, collection: Collection) -> Result<u64, StorageError>;

    /// Total number of records across all collections.
    async fn total_records(&self) -> Result<u64, StorageError>;
}
