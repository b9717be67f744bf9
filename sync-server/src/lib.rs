//! # clubsync-server
//!
//! Authoritative sync server for the Clubsync platform.
//!
//! This crate implements the server the sync clients poll:
//! - REST CRUD over the five record collections
//! - A wholesale `/api/sync` endpoint replacing every collection at once
//! - A WebSocket channel broadcasting change events to subscribers
//! - Durable SQLite storage
//!
//! ## Architecture
//!
//! ```text
//! Client A ──┐                    ┌── Client B
//!            │    HTTP + WS       │
//!            ├───────────────────►│
//!            │                    │
//!        ┌───┴────────────────────┴───┐
//!        │       clubsync-server      │
//!        │  ┌─────────────────────┐   │
//!        │  │  SQLite (records)   │   │
//!        │  └─────────────────────┘   │
//!        └────────────────────────────┘
//! ```
//!
//! ## Endpoints
//!
//! - `GET/POST /api/<collection>`, `PUT/DELETE /api/<collection>/<id>`
//! - `POST /api/sync` (last-writer-wins snapshot replacement)
//! - `GET /api/events` (WebSocket change events)
//! - `GET /health`, `GET /metrics`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod http;
pub mod server;
pub mod storage;
