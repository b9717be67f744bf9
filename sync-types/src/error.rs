//! Error types for Clubsync.

use thiserror::Error;

/// Errors that can occur when handling Clubsync types.
#[derive(Debug, Error)]
pub enum SyncError {
    /// JSON serialization or deserialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Collection name not one of the five known collections
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// Identifier could not be parsed
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Record body missing or malformed
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::UnknownCollection("payments".to_string());
        assert_eq!(err.to_string(), "unknown collection: payments");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncError>();
    }
}
