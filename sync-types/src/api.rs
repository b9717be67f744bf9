//! HTTP and WebSocket wire types.
//!
//! The REST API wraps every successful response in `{ "success": true,
//! "data": … }` and every failure in `{ "success": false, "error": … }`.
//! The WebSocket channel carries JSON-encoded [`ChangeEvent`] frames.

use serde::{Deserialize, Serialize};

use crate::{Collection, RecordId, Snapshot};

/// Success envelope for API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Always `true` on this envelope.
    pub success: bool,
    /// The response payload.
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wrap a payload in a success envelope.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Error envelope for API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Always `false` on this envelope.
    pub success: bool,
    /// Human-readable error description.
    pub error: String,
}

impl ApiErrorBody {
    /// Wrap an error message in a failure envelope.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Body of the wholesale `POST /api/sync` request.
///
/// Replaces every server-side collection with the submitted snapshot
/// (last-writer-wins, no merge).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    /// The full client snapshot.
    pub data: Snapshot,
}

/// A change event broadcast to WebSocket subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ChangeEvent {
    /// A wholesale snapshot replacement happened.
    DataSync,
    /// A record was created.
    RecordAdded {
        /// Collection the record was added to.
        collection: Collection,
        /// The stored record body.
        record: serde_json::Value,
    },
    /// A record was updated.
    RecordChanged {
        /// Collection the record belongs to.
        collection: Collection,
        /// The stored record body.
        record: serde_json::Value,
    },
    /// A record was deleted.
    RecordDeleted {
        /// Collection the record was deleted from.
        collection: Collection,
        /// Id of the deleted record.
        id: RecordId,
    },
}

impl ChangeEvent {
    /// The collection this event concerns, if any.
    pub fn collection(&self) -> Option<Collection> {
        match self {
            ChangeEvent::DataSync => None,
            ChangeEvent::RecordAdded { collection, .. }
            | ChangeEvent::RecordChanged { collection, .. }
            | ChangeEvent::RecordDeleted { collection, .. } => Some(*collection),
        }
    }
}
