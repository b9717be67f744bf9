//! Transport abstraction for the sync client.
//!
//! This module provides a pluggable transport layer that abstracts how the
//! client reaches the server (HTTP REST, mock for testing).
//!
//! # Design
//!
//! Polling over plain HTTP is the baseline every implementation must provide:
//! - `probe()` checks reachability
//! - `fetch()` reads one collection
//! - `deliver()` performs one queued create/update/delete
//! - `push_snapshot()` submits a wholesale snapshot
//!
//! `subscribe()` is the capability-detection point for the push enhancement:
//! a transport that can receive server change events returns a stream, one
//! that cannot returns `None`, and the client keeps polling either way.

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::MockTransport;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;
use sync_types::{ChangeEvent, Collection, PendingOp, Record, Snapshot};

/// A stream of server change events from the push channel.
pub type EventStream = BoxStream<'static, ChangeEvent>;

/// Transport errors, by failure class.
///
/// All three classes are soft failures to the client: the affected
/// collection stays stale and the triggering operation stays queued.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network unreachable, connection refused, DNS failure.
    #[error("network error: {0}")]
    Network(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-2xx status and an error body.
    #[error("server error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body, or the status reason.
        message: String,
    },

    /// The response body was not the expected JSON.
    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

impl TransportError {
    /// Whether this error means the server could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, TransportError::Network(_) | TransportError::Timeout)
    }
}

/// Transport trait for reaching the sync server.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Check that the server is reachable.
    async fn probe(&self) -> Result<(), TransportError>;

    /// Fetch all records of one collection.
    async fn fetch(&self, collection: Collection) -> Result<Vec<Record>, TransportError>;

    /// Deliver one queued operation.
    async fn deliver(&self, op: &PendingOp) -> Result<(), TransportError>;

    /// Submit a wholesale snapshot, replacing all server-side collections.
    async fn push_snapshot(&self, snapshot: &Snapshot) -> Result<(), TransportError>;

    /// Open the push channel, if this transport supports one.
    ///
    /// Returns `Ok(None)` when push is unavailable - polling continues
    /// regardless, push only shortens the latency.
    async fn subscribe(&self) -> Result<Option<EventStream>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_classification() {
        assert!(TransportError::Network("refused".into()).is_unreachable());
        assert!(TransportError::Timeout.is_unreachable());
        assert!(!TransportError::Api {
            status: 500,
            message: "boom".into()
        }
        .is_unreachable());
        assert!(!TransportError::InvalidBody("not json".into()).is_unreachable());
    }

    #[test]
    fn error_display() {
        let err = TransportError::Api {
            status: 404,
            message: "unknown collection: payments".into(),
        };
        assert_eq!(
            err.to_string(),
            "server error (404): unknown collection: payments"
        );
    }
}
