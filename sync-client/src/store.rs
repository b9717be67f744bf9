//! Durable local storage for the sync client.
//!
//! One JSON document per collection under a data directory, plus the
//! persisted pending queue and the last-sync timestamp. This is the client's
//! "local storage": the cache survives restarts, and so does the queue, so
//! unacknowledged mutations are retried instead of lost.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sync_types::{Collection, PendingOp, Snapshot};
use thiserror::Error;

/// Local store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted document could not be parsed.
    #[error("corrupt store file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Last-sync marker document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LastSync {
    /// Unix timestamp of the last completed sync pass.
    timestamp: u64,
}

/// File-backed local store.
///
/// Layout under the data directory:
/// - `members.json`, `teams.json`, `players.json`, `events.json`,
///   `friends.json` - one array per collection
/// - `pending.json` - the persisted pending-operation queue
/// - `last_sync.json` - timestamp of the last completed sync
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ensure the data directory exists.
    pub async fn init(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    fn collection_path(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}.json", collection))
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &Path,
    ) -> Result<Option<T>, StoreError> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(value)?;
        tokio::fs::write(path, contents).await?;
        Ok(())
    }

    /// Load the full snapshot. Missing files yield empty collections.
    pub async fn load_snapshot(&self) -> Result<Snapshot, StoreError> {
        let mut snapshot = Snapshot::default();
        for collection in Collection::ALL {
            let path = self.collection_path(collection);
            match collection {
                Collection::Members => {
                    snapshot.members = self.read_json(&path).await?.unwrap_or_default();
                }
                Collection::Teams => {
                    snapshot.teams = self.read_json(&path).await?.unwrap_or_default();
                }
                Collection::Players => {
                    snapshot.players = self.read_json(&path).await?.unwrap_or_default();
                }
                Collection::Events => {
                    snapshot.events = self.read_json(&path).await?.unwrap_or_default();
                }
                Collection::Friends => {
                    snapshot.friends = self.read_json(&path).await?.unwrap_or_default();
                }
            }
        }
        Ok(snapshot)
    }

    /// Persist one collection from the snapshot.
    pub async fn save_collection(
        &self,
        snapshot: &Snapshot,
        collection: Collection,
    ) -> Result<(), StoreError> {
        let path = self.collection_path(collection);
        match collection {
            Collection::Members => self.write_json(&path, &snapshot.members).await,
            Collection::Teams => self.write_json(&path, &snapshot.teams).await,
            Collection::Players => self.write_json(&path, &snapshot.players).await,
            Collection::Events => self.write_json(&path, &snapshot.events).await,
            Collection::Friends => self.write_json(&path, &snapshot.friends).await,
        }
    }

    /// Persist the whole snapshot.
    pub async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        for collection in Collection::ALL {
            self.save_collection(snapshot, collection).await?;
        }
        Ok(())
    }

    /// Load the persisted pending queue.
    pub async fn load_queue(&self) -> Result<Vec<PendingOp>, StoreError> {
        let path = self.dir.join("pending.json");
        Ok(self.read_json(&path).await?.unwrap_or_default())
    }

    /// Persist the pending queue.
    pub async fn save_queue(&self, ops: &[PendingOp]) -> Result<(), StoreError> {
        let path = self.dir.join("pending.json");
        self.write_json(&path, &ops).await
    }

    /// Timestamp of the last completed sync pass, if any.
    pub async fn last_sync(&self) -> Result<Option<u64>, StoreError> {
        let path = self.dir.join("last_sync.json");
        let marker: Option<LastSync> = self.read_json(&path).await?;
        Ok(marker.map(|m| m.timestamp))
    }

    /// Record the timestamp of a completed sync pass.
    pub async fn save_last_sync(&self, timestamp: u64) -> Result<(), StoreError> {
        let path = self.dir.join("last_sync.json");
        self.write_json(&path, &LastSync { timestamp }).await
    }
}
