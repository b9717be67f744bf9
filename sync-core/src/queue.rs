//! Pending-operation queue for Clubsync.
//!
//! This module provides a queue for outgoing write intents with:
//! - FIFO ordering for delivery
//! - In-flight tracking (operations sent but not yet acknowledged)
//! - Max size limits to prevent unbounded memory growth
//!
//! The queue is used by sync-client to manage optimistic mutations awaiting
//! server confirmation. Operations are enqueued, dequeued for delivery, and
//! remain "in flight" until acknowledged. If delivery fails, `nack()` moves
//! the operation back to the front of the queue for the next flush.
//!
//! The whole queue (queued + in-flight, in order) can be exported with
//! [`OpQueue::persistable`] so the client can persist it across restarts.

use std::collections::VecDeque;
use sync_types::{OpId, PendingOp};

/// Error type for queue operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Queue is at capacity.
    Full {
        /// Configured queue capacity.
        capacity: usize,
    },
}

impl std::fmt::Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueError::Full { capacity } => {
                write!(f, "pending queue full (capacity: {})", capacity)
            }
        }
    }
}

impl std::error::Error for QueueError {}

/// Bounded FIFO queue of pending operations with in-flight tracking.
///
/// Operations flow through the queue in this order:
/// 1. `enqueue()` - add to the queue
/// 2. `dequeue()` - remove from queue, move to in-flight
/// 3. `ack()` - remove from in-flight (delivery confirmed)
///
/// If delivery fails, call `nack()` to move the operation back to the front
/// of the queue.
#[derive(Debug, Clone)]
pub struct OpQueue {
    /// Maximum number of operations (queued + in-flight).
    capacity: usize,
    /// Operations waiting to be delivered.
    queue: VecDeque<PendingOp>,
    /// Operations delivered but not yet acknowledged, in dequeue order.
    inflight: Vec<PendingOp>,
}

impl OpQueue {
    /// Create a new queue with the given capacity.
    ///
    /// The capacity covers both queued and in-flight operations.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queue: VecDeque::new(),
            inflight: Vec::new(),
        }
    }

    /// Add an operation to the back of the queue.
    ///
    /// Returns an error if the queue is full (queued + in-flight >= capacity).
    /// Rejecting the newest intent is deliberate: evicting an older queued
    /// operation would silently drop a mutation whose optimistic local copy
    /// already exists.
    pub fn enqueue(&mut self, op: PendingOp) -> Result<(), QueueError> {
        if self.total_count() >= self.capacity {
            return Err(QueueError::Full {
                capacity: self.capacity,
            });
        }
        self.queue.push_back(op);
        Ok(())
    }

    /// Remove and return the next operation from the queue.
    ///
    /// The operation is moved to the in-flight set until acknowledged.
    pub fn dequeue(&mut self) -> Option<PendingOp> {
        let op = self.queue.pop_front()?;
        self.inflight.push(op.clone());
        Some(op)
    }

    /// Acknowledge successful delivery of an operation.
    pub fn ack(&mut self, op_id: &OpId) {
        self.inflight.retain(|op| op.op_id != *op_id);
    }

    /// Negative acknowledge - move an operation back to the front of the queue.
    ///
    /// Used when delivery fails and the operation should be retried on the
    /// next flush. Call in reverse dequeue order to preserve FIFO ordering.
    pub fn nack(&mut self, op_id: &OpId) {
        if let Some(index) = self.inflight.iter().position(|op| op.op_id == *op_id) {
            let op = self.inflight.remove(index);
            self.queue.push_front(op);
        }
    }

    /// Check if an operation is in flight (delivered but not acknowledged).
    pub fn is_inflight(&self, op_id: &OpId) -> bool {
        self.inflight.iter().any(|op| op.op_id == *op_id)
    }

    /// Number of operations waiting in the queue (not including in-flight).
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of in-flight operations.
    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }

    /// Total number of operations (queued + in-flight).
    pub fn total_count(&self) -> usize {
        self.queue.len() + self.inflight.len()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All operations in delivery order, for persistence.
    ///
    /// In-flight operations come first (they were dequeued earlier), then the
    /// queued ones. Restoring this list with [`OpQueue::restore`] treats every
    /// operation as queued again - unacknowledged deliveries are retried.
    pub fn persistable(&self) -> Vec<PendingOp> {
        self.inflight
            .iter()
            .chain(self.queue.iter())
            .cloned()
            .collect()
    }

    /// Replace the queue contents with previously persisted operations.
    ///
    /// Operations beyond capacity are dropped; returns how many were dropped.
    pub fn restore(&mut self, ops: Vec<PendingOp>) -> usize {
        self.inflight.clear();
        self.queue.clear();

        let mut dropped = 0;
        for op in ops {
            if self.queue.len() >= self.capacity {
                dropped += 1;
                continue;
            }
            self.queue.push_back(op);
        }
        dropped
    }

    /// Clear all operations (both queued and in-flight).
    pub fn clear(&mut self) {
        self.queue.clear();
        self.inflight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_types::{Collection, Member, Mutation, Record, RecordId};

    fn make_op() -> PendingOp {
        PendingOp::new(
            Mutation::Create {
                record: Record::Member(Member {
                    id: RecordId::new(),
                    name: "Ana".to_string(),
                    document: "12345678A".to_string(),
                    phone: String::new(),
                    email: String::new(),
                    synced: false,
                }),
            },
            1_705_000_000,
        )
    }

    fn make_delete(n: u64) -> PendingOp {
        PendingOp::new(
            Mutation::Delete {
                collection: Collection::Members,
                id: RecordId::new(),
            },
            n,
        )
    }

    #[test]
    fn queue_holds_operations() {
        let mut queue = OpQueue::new(100);
        queue.enqueue(make_op()).unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn queue_respects_capacity() {
        let mut queue = OpQueue::new(2);

        queue.enqueue(make_op()).unwrap();
        queue.enqueue(make_op()).unwrap();
        let overflow = queue.enqueue(make_op());

        assert_eq!(overflow, Err(QueueError::Full { capacity: 2 }));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn queue_dequeues_in_insertion_order() {
        let mut queue = OpQueue::new(100);
        let first = make_delete(1);
        let second = make_delete(2);

        queue.enqueue(first.clone()).unwrap();
        queue.enqueue(second).unwrap();

        assert_eq!(queue.dequeue().unwrap().op_id, first.op_id);
    }

    #[test]
    fn dequeue_marks_inflight_until_ack() {
        let mut queue = OpQueue::new(100);
        let op = make_op();
        let op_id = op.op_id;

        queue.enqueue(op).unwrap();
        queue.dequeue().unwrap();

        assert!(queue.is_inflight(&op_id));

        queue.ack(&op_id);
        assert!(!queue.is_inflight(&op_id));
        assert_eq!(queue.total_count(), 0);
    }

    #[test]
    fn dequeue_returns_none_when_empty() {
        let mut queue = OpQueue::new(100);
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn inflight_counts_toward_capacity() {
        let mut queue = OpQueue::new(2);

        queue.enqueue(make_op()).unwrap();
        queue.enqueue(make_op()).unwrap();
        queue.dequeue();

        assert!(queue.enqueue(make_op()).is_err());
    }

    #[test]
    fn ack_frees_capacity() {
        let mut queue = OpQueue::new(2);

        let op = make_op();
        let op_id = op.op_id;
        queue.enqueue(op).unwrap();
        queue.enqueue(make_op()).unwrap();

        queue.dequeue();
        queue.ack(&op_id);

        assert!(queue.enqueue(make_op()).is_ok());
    }

    #[test]
    fn nack_moves_to_front_of_queue() {
        let mut queue = OpQueue::new(100);

        let first = make_delete(1);
        let first_id = first.op_id;
        queue.enqueue(first).unwrap();
        queue.enqueue(make_delete(2)).unwrap();

        queue.dequeue();
        assert!(queue.is_inflight(&first_id));

        queue.nack(&first_id);
        assert!(!queue.is_inflight(&first_id));

        let retry = queue.dequeue().unwrap();
        assert_eq!(retry.op_id, first_id);
    }

    #[test]
    fn nack_in_reverse_restores_fifo_order() {
        let mut queue = OpQueue::new(100);
        let a = make_delete(1);
        let b = make_delete(2);
        let (a_id, b_id) = (a.op_id, b.op_id);

        queue.enqueue(a).unwrap();
        queue.enqueue(b).unwrap();

        // Flush pass: both dequeued, both fail
        queue.dequeue();
        queue.dequeue();

        // Nack in reverse dequeue order
        queue.nack(&b_id);
        queue.nack(&a_id);

        assert_eq!(queue.dequeue().unwrap().op_id, a_id);
        assert_eq!(queue.dequeue().unwrap().op_id, b_id);
    }

    #[test]
    fn persistable_keeps_delivery_order() {
        let mut queue = OpQueue::new(100);
        let a = make_delete(1);
        let b = make_delete(2);
        let c = make_delete(3);
        let ids = [a.op_id, b.op_id, c.op_id];

        queue.enqueue(a).unwrap();
        queue.enqueue(b).unwrap();
        queue.enqueue(c).unwrap();
        queue.dequeue(); // a in flight

        let persisted = queue.persistable();
        let persisted_ids: Vec<_> = persisted.iter().map(|op| op.op_id).collect();
        assert_eq!(persisted_ids, ids);
    }

    #[test]
    fn restore_replaces_contents_and_truncates() {
        let mut queue = OpQueue::new(2);
        queue.enqueue(make_op()).unwrap();

        let ops = vec![make_delete(1), make_delete(2), make_delete(3)];
        let dropped = queue.restore(ops);

        assert_eq!(dropped, 1);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.inflight_count(), 0);
    }

    #[test]
    fn restore_then_persist_roundtrips() {
        let mut queue = OpQueue::new(100);
        let ops = vec![make_delete(1), make_delete(2)];
        queue.restore(ops.clone());
        assert_eq!(queue.persistable(), ops);
    }

    #[test]
    fn clear_removes_all() {
        let mut queue = OpQueue::new(100);
        queue.enqueue(make_op()).unwrap();
        queue.enqueue(make_op()).unwrap();
        queue.dequeue();

        queue.clear();

        assert_eq!(queue.total_count(), 0);
    }

    #[test]
    fn ack_nonexistent_is_no_op() {
        let mut queue = OpQueue::new(100);
        queue.ack(&OpId::new());
        assert_eq!(queue.inflight_count(), 0);
    }

    #[test]
    fn nack_nonexistent_is_no_op() {
        let mut queue = OpQueue::new(100);
        queue.nack(&OpId::new());
        assert_eq!(queue.len(), 0);
    }
}
