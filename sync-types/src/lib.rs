//! # clubsync-types
//!
//! Shared types for the Clubsync sports-club sync platform.
//!
//! This crate provides the foundational types used across all Clubsync crates:
//! - [`RecordId`], [`OpId`], [`ClientId`] - Identity types
//! - [`Member`], [`Team`], [`Player`], [`Event`], [`Friend`] - Domain records
//! - [`Collection`], [`Record`], [`Snapshot`] - Generic record plumbing
//! - [`Mutation`], [`PendingOp`] - Queued write intents
//! - [`ApiResponse`], [`ChangeEvent`] - HTTP/WebSocket wire types
//! - [`SyncError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod api;
mod error;
mod ids;
mod ops;
mod records;

pub use api::{ApiErrorBody, ApiResponse, ChangeEvent, SyncRequest};
pub use error::SyncError;
pub use ids::{ClientId, OpId, RecordId};
pub use ops::{Mutation, PendingOp};
pub use records::{Collection, Event, Friend, Member, Player, Record, Snapshot, Team};
