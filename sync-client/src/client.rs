//! SyncClient - the main interface for Clubsync.
//!
//! This module provides [`SyncClient`], the primary API applications use to
//! keep a local cache of club records eventually consistent with the server.
//!
//! # Architecture
//!
//! SyncClient uses a pure state machine (from sync-core) for lifecycle logic
//! and a single driver task that interprets its actions and performs the
//! actual I/O via the Transport trait.
//!
//! ```text
//! Application → SyncClient → Transport → Network
//!                   ↓              ↓
//!              sync-core      LocalStore (durable cache + queue)
//! ```
//!
//! Polling is the primary transport. When the transport reports a push
//! channel, server change events shorten the latency but never replace the
//! periodic sync pass.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Mutex};

use futures_util::StreamExt;
use sync_core::{
    backoff_delay, cache, Action, ClientEvent, ConnectionState, Event as LifecycleEvent, OpQueue,
    QueueError, RetryPolicy,
};
use sync_types::{ChangeEvent, Collection, Mutation, OpId, PendingOp, Record, RecordId, Snapshot};

use crate::store::{LocalStore, StoreError};
use crate::transport::{EventStream, Transport, TransportError};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Local store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Pending queue rejected the operation.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}

/// Configuration for SyncClient.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the sync server.
    pub server_url: String,
    /// Human-readable client name (used in logs).
    pub client_name: String,
    /// Interval between periodic sync passes.
    pub poll_interval: Duration,
    /// Capacity of the pending-operation queue.
    pub queue_capacity: usize,
    /// Reconnection limits.
    pub retry: RetryPolicy,
}

impl SyncConfig {
    /// Create a configuration with defaults for the given server.
    pub fn new(server_url: &str) -> Self {
        Self {
            server_url: server_url.to_string(),
            client_name: "clubsync client".to_string(),
            poll_interval: Duration::from_secs(30),
            queue_capacity: 1024,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the client name.
    pub fn with_client_name(mut self, name: &str) -> Self {
        self.client_name = name.to_string();
        self
    }

    /// Set the polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the pending-queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the maximum consecutive reconnect attempts before suspending.
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.retry = RetryPolicy {
            max_attempts: attempts,
        };
        self
    }
}

/// Outcome of one sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Collections fetched and overwritten successfully.
    pub fetched: usize,
    /// Collections whose fetch failed (left stale).
    pub failed: usize,
    /// True when every fetch failed at the network level.
    pub transport_down: bool,
    /// Outcome of the flush that followed the fetches.
    pub flush: FlushReport,
}

/// Outcome of one flush pass over the pending queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Operations acknowledged and removed from the queue.
    pub delivered: usize,
    /// Operations that failed and remain queued.
    pub failed: usize,
    /// Operations still queued after the pass.
    pub remaining: usize,
}

/// Shared state between the client handle and its driver task.
struct Shared<T: Transport> {
    config: SyncConfig,
    transport: T,
    store: LocalStore,
    snapshot: Mutex<Snapshot>,
    queue: Mutex<OpQueue>,
    state: Mutex<ConnectionState>,
    events: broadcast::Sender<ClientEvent>,
    /// Serializes sync passes so a manual sync and a timer tick cannot
    /// interleave their read-modify-write of the cache and queue.
    sync_gate: Mutex<()>,
}

impl<T: Transport> Shared<T> {
    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    /// Feed an event through the state machine and return its actions.
    async fn apply(&self, event: LifecycleEvent) -> Vec<Action> {
        let mut state = self.state.lock().await;
        let (next, actions) = state.clone().on_event(event, &self.config.retry);
        *state = next;
        actions
    }

    /// Execute the I/O-bearing actions produced by the state machine.
    ///
    /// Timer and polling actions are structural: the driver loop embodies
    /// them by construction, so only flush and emit need interpreting here.
    async fn execute(&self, actions: &[Action]) {
        for action in actions {
            match action {
                Action::FlushQueue => {
                    self.flush_pending().await;
                }
                Action::EmitEvent(event) => self.emit(event.clone()),
                Action::Probe
                | Action::StartPolling
                | Action::StopPolling
                | Action::StartRetryTimer { .. }
                | Action::CancelRetry => {}
            }
        }
    }

    async fn is_online(&self) -> bool {
        self.state.lock().await.is_online()
    }

    /// One full sync pass: fetch all collections, flush the queue, record
    /// the timestamp. Never fails - every error is caught, logged and
    /// reported as a soft failure.
    async fn sync(&self) -> SyncReport {
        let _gate = self.sync_gate.lock().await;

        let fetches = futures_util::future::join_all(Collection::ALL.iter().map(|collection| {
            let collection = *collection;
            async move { (collection, self.transport.fetch(collection).await) }
        }))
        .await;

        let mut fetched = 0;
        let mut failed = 0;
        let mut unreachable = 0;

        for (collection, result) in fetches {
            match result {
                Ok(records) => {
                    let count = records.len();
                    let mut snapshot = self.snapshot.lock().await;
                    cache::overwrite(&mut snapshot, collection, records);
                    if let Err(e) = self.store.save_collection(&snapshot, collection).await {
                        tracing::warn!("failed to persist {}: {}", collection, e);
                    }
                    drop(snapshot);

                    fetched += 1;
                    self.emit(ClientEvent::CollectionUpdated { collection, count });
                }
                Err(e) => {
                    tracing::warn!("fetch of {} failed, keeping stale data: {}", collection, e);
                    failed += 1;
                    if e.is_unreachable() {
                        unreachable += 1;
                    }
                }
            }
        }

        let flush = self.flush_pending().await;

        // Only a pass that actually reached the server moves the marker.
        if fetched > 0 {
            if let Err(e) = self.store.save_last_sync(unix_now()).await {
                tracing::warn!("failed to record sync timestamp: {}", e);
            }
        }

        self.emit(ClientEvent::SyncCompleted { fetched, failed });

        SyncReport {
            fetched,
            failed,
            transport_down: unreachable == Collection::ALL.len(),
            flush,
        }
    }

    /// Deliver queued operations in insertion order.
    ///
    /// Successes are acknowledged and their local records marked synced;
    /// failures return to the front of the queue, in order, for the next
    /// flush. One pass, no per-operation backoff.
    async fn flush_pending(&self) -> FlushReport {
        let initial = self.queue.lock().await.len();
        let mut delivered = 0;
        let mut failed_ops: Vec<OpId> = Vec::new();

        for _ in 0..initial {
            let op = match self.queue.lock().await.dequeue() {
                Some(op) => op,
                None => break,
            };

            match self.transport.deliver(&op).await {
                Ok(()) => {
                    self.queue.lock().await.ack(&op.op_id);
                    if let Mutation::Create { record } | Mutation::Update { record } =
                        &op.mutation
                    {
                        let mut snapshot = self.snapshot.lock().await;
                        cache::mark_synced(&mut snapshot, record.collection(), record.id());
                        if let Err(e) =
                            self.store.save_collection(&snapshot, record.collection()).await
                        {
                            tracing::warn!("failed to persist {}: {}", record.collection(), e);
                        }
                    }
                    delivered += 1;
                }
                Err(e) => {
                    tracing::warn!("delivery of {} failed, keeping queued: {}", op.op_id, e);
                    failed_ops.push(op.op_id);
                }
            }
        }

        let remaining = {
            let mut queue = self.queue.lock().await;
            // Reverse order puts the failures back at the front in their
            // original relative order.
            for op_id in failed_ops.iter().rev() {
                queue.nack(op_id);
            }
            queue.len()
        };

        if let Err(e) = self.persist_queue().await {
            tracing::warn!("failed to persist pending queue: {}", e);
        }

        if initial > 0 {
            self.emit(ClientEvent::QueueFlushed {
                delivered,
                remaining,
            });
        }

        FlushReport {
            delivered,
            failed: failed_ops.len(),
            remaining,
        }
    }

    async fn persist_queue(&self) -> Result<(), StoreError> {
        let ops = self.queue.lock().await.persistable();
        self.store.save_queue(&ops).await
    }

    /// Queue a mutation and, when online, attempt immediate delivery.
    async fn enqueue(&self, mutation: Mutation) -> Result<OpId, ClientError> {
        let op = PendingOp::new(mutation, unix_now());
        let op_id = op.op_id;

        self.queue.lock().await.enqueue(op)?;
        self.persist_queue().await?;

        if self.is_online().await {
            self.flush_pending().await;
        }

        Ok(op_id)
    }

    /// Apply a mutation to the local cache and persist the collection.
    async fn apply_local(&self, mutation: &Mutation) -> Result<(), ClientError> {
        let collection = mutation.collection();
        let mut snapshot = self.snapshot.lock().await;
        cache::apply(&mut snapshot, mutation);
        self.store.save_collection(&snapshot, collection).await?;
        Ok(())
    }
}

/// The main sync client.
///
/// Explicitly constructed with an injected transport and store, explicitly
/// started and stopped. Cheap to share: all state lives behind an `Arc`.
pub struct SyncClient<T: Transport> {
    shared: Arc<Shared<T>>,
    driver: Mutex<Option<tokio::task::JoinHandle<()>>>,
    commands: Mutex<Option<mpsc::UnboundedSender<LifecycleEvent>>>,
}

impl<T: Transport> SyncClient<T> {
    /// Create a new SyncClient, restoring the cache and pending queue from
    /// the store.
    pub async fn new(
        config: SyncConfig,
        transport: T,
        store: LocalStore,
    ) -> Result<Self, ClientError> {
        store.init().await?;
        let snapshot = store.load_snapshot().await?;

        let mut queue = OpQueue::new(config.queue_capacity);
        let dropped = queue.restore(store.load_queue().await?);
        if dropped > 0 {
            tracing::warn!(
                "persisted queue exceeded capacity {}, dropped {} operations",
                config.queue_capacity,
                dropped
            );
        }

        let (events, _) = broadcast::channel(64);

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                transport,
                store,
                snapshot: Mutex::new(snapshot),
                queue: Mutex::new(queue),
                state: Mutex::new(ConnectionState::new()),
                events,
                sync_gate: Mutex::new(()),
            }),
            driver: Mutex::new(None),
            commands: Mutex::new(None),
        })
    }

    /// Subscribe to client events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.shared.events.subscribe()
    }

    /// Start the driver task. Idempotent.
    pub async fn start(&self) {
        let mut driver = self.driver.lock().await;
        if driver.is_some() {
            return;
        }

        tracing::info!(client = %self.shared.config.client_name, "starting sync client");

        let (tx, rx) = mpsc::unbounded_channel();
        *self.commands.lock().await = Some(tx);

        let actions = self.shared.apply(LifecycleEvent::StartRequested).await;
        self.shared.execute(&actions).await;

        *driver = Some(tokio::spawn(run_driver(Arc::clone(&self.shared), rx)));
    }

    /// Stop the driver task and halt all timers. The queue stays intact.
    pub async fn stop(&self) {
        let tx = self.commands.lock().await.take();
        if let Some(tx) = tx {
            let _ = tx.send(LifecycleEvent::StopRequested);
        }

        let handle = self.driver.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        // Settle the state machine even if the driver was never running.
        let actions = self.shared.apply(LifecycleEvent::StopRequested).await;
        self.shared.execute(&actions).await;
    }

    /// Signal a platform connectivity change.
    ///
    /// Regaining connectivity resumes polling and immediately flushes the
    /// queue; losing it halts the polling timers and leaves the queue intact.
    pub async fn set_connectivity(&self, online: bool) {
        let tx = self.commands.lock().await.clone();
        match tx {
            Some(tx) => {
                let _ = tx.send(LifecycleEvent::ConnectivityChanged { online });
            }
            None => {
                let actions = self
                    .shared
                    .apply(LifecycleEvent::ConnectivityChanged { online })
                    .await;
                self.shared.execute(&actions).await;
            }
        }
    }

    /// Run one sync pass now.
    ///
    /// Safe to call concurrently with the periodic timer; passes are
    /// serialized. Never fails - failures degrade to stale data.
    pub async fn sync(&self) -> SyncReport {
        self.shared.sync().await
    }

    /// Queue a mutation for delivery without touching the local cache.
    ///
    /// The optimistic wrappers ([`SyncClient::create`] and friends) are the
    /// usual entry points; this is the raw queue operation behind them.
    /// When online, delivery is attempted immediately.
    pub async fn enqueue(&self, mutation: Mutation) -> Result<OpId, ClientError> {
        self.shared.enqueue(mutation).await
    }

    /// Attempt delivery of the pending queue now.
    pub async fn flush_pending(&self) -> FlushReport {
        self.shared.flush_pending().await
    }

    /// Create a record: apply locally with `synced = false`, then queue the
    /// remote create.
    pub async fn create(&self, mut record: Record) -> Result<RecordId, ClientError> {
        record.set_synced(false);
        let id = record.id();
        let mutation = Mutation::Create { record };
        self.shared.apply_local(&mutation).await?;
        self.shared.enqueue(mutation).await?;
        Ok(id)
    }

    /// Update a record: apply locally with `synced = false`, then queue the
    /// remote update.
    pub async fn update(&self, mut record: Record) -> Result<(), ClientError> {
        record.set_synced(false);
        let mutation = Mutation::Update { record };
        self.shared.apply_local(&mutation).await?;
        self.shared.enqueue(mutation).await?;
        Ok(())
    }

    /// Delete a record: remove locally, then queue the remote delete.
    pub async fn delete(
        &self,
        collection: Collection,
        id: RecordId,
    ) -> Result<(), ClientError> {
        let mutation = Mutation::Delete { collection, id };
        self.shared.apply_local(&mutation).await?;
        self.shared.enqueue(mutation).await?;
        Ok(())
    }

    /// Submit the whole local snapshot, replacing all server-side
    /// collections (last-writer-wins).
    pub async fn push_snapshot(&self) -> Result<(), ClientError> {
        let snapshot = self.shared.snapshot.lock().await.clone();
        self.shared.transport.push_snapshot(&snapshot).await?;
        Ok(())
    }

    /// Current records of one collection.
    pub async fn records(&self, collection: Collection) -> Vec<Record> {
        self.shared.snapshot.lock().await.records(collection)
    }

    /// A copy of the full local snapshot.
    pub async fn snapshot(&self) -> Snapshot {
        self.shared.snapshot.lock().await.clone()
    }

    /// Number of operations waiting for delivery.
    pub async fn pending_count(&self) -> usize {
        self.shared.queue.lock().await.total_count()
    }

    /// Whether the client is currently online.
    pub async fn is_online(&self) -> bool {
        self.shared.is_online().await
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.shared.state.lock().await.clone()
    }

    /// Timestamp of the last completed sync pass.
    pub async fn last_sync(&self) -> Option<u64> {
        self.shared.store.last_sync().await.ok().flatten()
    }
}

/// The single driver task: one logical timer, state-directed.
async fn run_driver<T: Transport>(
    shared: Arc<Shared<T>>,
    mut commands: mpsc::UnboundedReceiver<LifecycleEvent>,
) {
    let mut push_events: Option<EventStream> = None;

    loop {
        let current = shared.state.lock().await.clone();
        match current {
            ConnectionState::Stopped => break,

            ConnectionState::Connecting { .. } => {
                let event = match shared.transport.probe().await {
                    Ok(()) => LifecycleEvent::ConnectSucceeded,
                    Err(e) => LifecycleEvent::ConnectFailed {
                        error: e.to_string(),
                    },
                };
                let actions = shared.apply(event).await;
                shared.execute(&actions).await;

                if shared.is_online().await {
                    if push_events.is_none() {
                        push_events = match shared.transport.subscribe().await {
                            Ok(stream) => stream,
                            Err(e) => {
                                tracing::debug!("push subscription failed: {}", e);
                                None
                            }
                        };
                    }
                    // Fresh connection: fetch before the first timer tick.
                    shared.sync().await;
                }
            }

            ConnectionState::Online => {
                let poll = tokio::time::sleep(shared.config.poll_interval);
                tokio::pin!(poll);

                tokio::select! {
                    _ = &mut poll => {
                        let report = shared.sync().await;
                        if report.transport_down {
                            let actions = shared
                                .apply(LifecycleEvent::ConnectionLost {
                                    reason: "server unreachable".into(),
                                })
                                .await;
                            shared.execute(&actions).await;
                            push_events = None;
                        }
                    }
                    command = commands.recv() => {
                        match command {
                            Some(event) => {
                                let actions = shared.apply(event).await;
                                shared.execute(&actions).await;
                                if !shared.is_online().await {
                                    push_events = None;
                                }
                            }
                            None => break,
                        }
                    }
                    event = next_push(&mut push_events) => {
                        match event {
                            Some(change) => {
                                shared.emit(ClientEvent::PushReceived { event: change });
                                shared.sync().await;
                            }
                            None => {
                                // Push channel closed; polling carries on.
                                push_events = None;
                            }
                        }
                    }
                }
            }

            ConnectionState::Backoff { attempt } => {
                let delay = backoff_delay(attempt);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        let actions = shared.apply(LifecycleEvent::RetryTimer).await;
                        shared.execute(&actions).await;
                    }
                    command = commands.recv() => {
                        match command {
                            Some(event) => {
                                let actions = shared.apply(event).await;
                                shared.execute(&actions).await;
                            }
                            None => break,
                        }
                    }
                }
            }

            ConnectionState::Suspended => match commands.recv().await {
                Some(event) => {
                    let actions = shared.apply(event).await;
                    shared.execute(&actions).await;
                }
                None => break,
            },
        }
    }
}

/// Next event from the push channel, pending forever when there is none.
async fn next_push(stream: &mut Option<EventStream>) -> Option<ChangeEvent> {
    match stream {
        Some(s) => s.next().await,
        None => std::future::pending().await,
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
