//! Main ClubServer coordination.
//!
//! ClubServer owns storage, the change-event broadcast hub, and the
//! operational metrics the HTTP layer exposes.

use crate::config::Config;
use crate::storage::SqliteStorage;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use sync_types::ChangeEvent;
use tokio::sync::broadcast;

/// Capacity of the change-event broadcast channel.
///
/// Subscribers that fall further behind than this are lagged and skip
/// ahead; they never block mutations.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Operational metrics for monitoring server activity.
///
/// All counters are monotonically increasing (reset only on restart).
/// Thread-safe via `AtomicU64`, no locks needed for incrementing.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    /// Total list requests handled successfully.
    pub lists_total: AtomicU64,
    /// Total create requests handled successfully.
    pub creates_total: AtomicU64,
    /// Total update requests handled successfully.
    pub updates_total: AtomicU64,
    /// Total delete requests handled successfully.
    pub deletes_total: AtomicU64,
    /// Total wholesale snapshot replacements.
    pub snapshot_syncs_total: AtomicU64,
    /// Total change events broadcast to subscribers.
    pub events_broadcast_total: AtomicU64,
    /// Total requests rejected with an application error.
    pub errors_total: AtomicU64,
}

/// Main server state shared across handlers.
pub struct ClubServer {
    config: Config,
    storage: Arc<SqliteStorage>,
    /// Operational metrics (counters).
    metrics: ServerMetrics,
    /// Change-event hub feeding WebSocket subscribers.
    events: broadcast::Sender<ChangeEvent>,
    /// Number of connected WebSocket subscribers.
    ws_clients: AtomicUsize,
}

impl std::fmt::Debug for ClubServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClubServer")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .field("ws_clients", &self.ws_client_count())
            .finish_non_exhaustive()
    }
}

impl ClubServer {
    /// Create a new ClubServer with the given config and storage.
    pub fn new(config: Config, storage: SqliteStorage) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            storage: Arc::new(storage),
            metrics: ServerMetrics::default(),
            events,
            ws_clients: AtomicUsize::new(0),
        }
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get access to the storage layer.
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &ServerMetrics {
        &self.metrics
    }

    /// Subscribe to change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    /// Broadcast a change event to all WebSocket subscribers.
    ///
    /// Fire-and-forget: a send with no subscribers is not an error.
    pub fn broadcast(&self, event: ChangeEvent) {
        self.metrics
            .events_broadcast_total
            .fetch_add(1, Ordering::Relaxed);

        match self.events.send(event) {
            Ok(receivers) => {
                tracing::debug!("broadcast change event to {} subscribers", receivers);
            }
            Err(_) => {
                tracing::debug!("broadcast change event with no subscribers");
            }
        }
    }

    /// Record a WebSocket subscriber connecting.
    pub fn ws_client_connected(&self) -> usize {
        self.ws_clients.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a WebSocket subscriber disconnecting.
    pub fn ws_client_disconnected(&self) -> usize {
        self.ws_clients.fetch_sub(1, Ordering::Relaxed).saturating_sub(1)
    }

    /// Number of connected WebSocket subscribers.
    pub fn ws_client_count(&self) -> usize {
        self.ws_clients.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_server() -> ClubServer {
        let storage = SqliteStorage::in_memory().await.unwrap();
        ClubServer::new(Config::default(), storage)
    }

    #[tokio::test]
    async fn broadcast_reaches_subscribers() {
        let server = test_server().await;
        let mut rx = server.subscribe();

        server.broadcast(ChangeEvent::DataSync);

        assert_eq!(rx.recv().await.unwrap(), ChangeEvent::DataSync);
        assert_eq!(
            server
                .metrics()
                .events_broadcast_total
                .load(Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_fine() {
        let server = test_server().await;
        server.broadcast(ChangeEvent::DataSync);
    }

    #[tokio::test]
    async fn ws_client_counter_tracks_connections() {
        let server = test_server().await;
        assert_eq!(server.ws_client_count(), 0);

        assert_eq!(server.ws_client_connected(), 1);
        assert_eq!(server.ws_client_connected(), 2);
        assert_eq!(server.ws_client_disconnected(), 1);
        assert_eq!(server.ws_client_count(), 1);
    }
}
