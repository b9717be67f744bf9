//! # clubsync-client
//!
//! Offline-first sync client for the Clubsync platform.
//!
//! This is the library that applications embed to keep a local, durable cache
//! of club records eventually consistent with the remote server.
//!
//! ## Features
//!
//! - **Optimistic mutations**: create/update/delete apply locally first and
//!   queue a delivery for the server
//! - **Bounded, persisted pending queue**: write intents survive restarts
//! - **Transport abstraction**: HTTP polling as the baseline, WebSocket push
//!   as a detected enhancement, mock for testing
//! - **Explicit lifecycle**: constructed with injected transport and store,
//!   driven by `start()`/`stop()` - no global singletons
//!
//! ## Example
//!
//! ```ignore
//! use clubsync_client::{HttpTransport, LocalStore, SyncClient, SyncConfig};
//!
//! let config = SyncConfig::new("http://localhost:8080");
//! let transport = HttpTransport::new(&config.server_url)?;
//! let store = LocalStore::new("/var/lib/clubsync");
//! let client = SyncClient::new(config, transport, store).await?;
//!
//! client.start().await;
//! let report = client.sync().await;
//! client.stop().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod store;
pub mod transport;

pub use client::{ClientError, FlushReport, SyncClient, SyncConfig, SyncReport};
pub use store::{LocalStore, StoreError};
pub use sync_core::ClientEvent;
pub use transport::{EventStream, HttpTransport, MockTransport, Transport, TransportError};
