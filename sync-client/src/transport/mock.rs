//! Mock transport for testing.
//!
//! Allows fixing per-collection fetch results, scripting delivery outcomes,
//! and capturing every request for verification.

use super::{EventStream, Transport, TransportError};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use sync_types::{ChangeEvent, Collection, Mutation, PendingOp, Record, Snapshot};

/// Mock transport for testing.
///
/// Behaves like a miniature server: successful deliveries mutate the
/// per-collection fixtures, so a poll after a delivered create sees the
/// record. Clones share state, so a test can keep a handle for assertions
/// while the client owns another.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    unreachable: bool,
    collections: HashMap<Collection, Vec<Record>>,
    fail_fetch_once: HashMap<Collection, String>,
    deliver_script: VecDeque<Result<(), String>>,
    delivered: Vec<PendingOp>,
    attempted: Vec<PendingOp>,
    pushed_snapshots: Vec<Snapshot>,
    push_events: Option<Vec<ChangeEvent>>,
    requests: usize,
}

impl MockTransport {
    /// Create a new mock transport (reachable, all collections empty).
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the records returned by every `fetch()` of a collection.
    pub fn set_records(&self, collection: Collection, records: Vec<Record>) {
        let mut inner = self.inner.lock().unwrap();
        inner.collections.insert(collection, records);
    }

    /// Make every request fail with a network error until reset.
    pub fn set_unreachable(&self, unreachable: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.unreachable = unreachable;
    }

    /// Cause the next `fetch()` of one collection to fail.
    pub fn fail_next_fetch(&self, collection: Collection, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_fetch_once.insert(collection, error.to_string());
    }

    /// Script the outcomes of upcoming `deliver()` calls, in order.
    ///
    /// Unscripted deliveries succeed.
    pub fn script_deliver(&self, outcomes: Vec<Result<(), &str>>) {
        let mut inner = self.inner.lock().unwrap();
        inner.deliver_script.extend(
            outcomes
                .into_iter()
                .map(|r| r.map_err(|e| e.to_string())),
        );
    }

    /// Queue change events to be produced by the next `subscribe()`.
    pub fn queue_push_events(&self, events: Vec<ChangeEvent>) {
        let mut inner = self.inner.lock().unwrap();
        inner.push_events = Some(events);
    }

    /// Operations that were delivered successfully.
    pub fn delivered_ops(&self) -> Vec<PendingOp> {
        self.inner.lock().unwrap().delivered.clone()
    }

    /// Every operation a delivery was attempted for, including failures.
    pub fn attempted_ops(&self) -> Vec<PendingOp> {
        self.inner.lock().unwrap().attempted.clone()
    }

    /// Snapshots submitted via `push_snapshot()`.
    pub fn pushed_snapshots(&self) -> Vec<Snapshot> {
        self.inner.lock().unwrap().pushed_snapshots.clone()
    }

    /// Total number of requests issued (probe + fetch + deliver + sync).
    pub fn request_count(&self) -> usize {
        self.inner.lock().unwrap().requests
    }
}

impl MockTransportInner {
    /// Mirror a delivered mutation into the fixtures, the way the real
    /// server applies it to storage.
    fn apply_mutation(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::Create { record } | Mutation::Update { record } => {
                let records = self.collections.entry(record.collection()).or_default();
                let mut record = record.clone();
                record.set_synced(false); // the synced flag never crosses the wire
                match records.iter().position(|r| r.id() == record.id()) {
                    Some(index) => records[index] = record,
                    None => records.push(record),
                }
            }
            Mutation::Delete { collection, id } => {
                if let Some(records) = self.collections.get_mut(collection) {
                    records.retain(|r| r.id() != *id);
                }
            }
        }
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn probe(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests += 1;
        if inner.unreachable {
            return Err(TransportError::Network("network unreachable".into()));
        }
        Ok(())
    }

    async fn fetch(&self, collection: Collection) -> Result<Vec<Record>, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests += 1;
        if inner.unreachable {
            return Err(TransportError::Network("network unreachable".into()));
        }
        if let Some(error) = inner.fail_fetch_once.remove(&collection) {
            return Err(TransportError::Network(error));
        }
        Ok(inner.collections.get(&collection).cloned().unwrap_or_default())
    }

    async fn deliver(&self, op: &PendingOp) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests += 1;
        inner.attempted.push(op.clone());
        if inner.unreachable {
            return Err(TransportError::Network("network unreachable".into()));
        }
        match inner.deliver_script.pop_front() {
            Some(Err(message)) => Err(TransportError::Api {
                status: 500,
                message,
            }),
            _ => {
                inner.apply_mutation(&op.mutation);
                inner.delivered.push(op.clone());
                Ok(())
            }
        }
    }

    async fn push_snapshot(&self, snapshot: &Snapshot) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests += 1;
        if inner.unreachable {
            return Err(TransportError::Network("network unreachable".into()));
        }
        for collection in Collection::ALL {
            inner
                .collections
                .insert(collection, snapshot.records(collection));
        }
        inner.pushed_snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn subscribe(&self) -> Result<Option<EventStream>, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.push_events.take() {
            Some(events) => Ok(Some(futures_util::stream::iter(events).boxed())),
            None => Ok(None),
        }
    }
}
