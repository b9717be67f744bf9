//! Queued write intents.
//!
//! A [`PendingOp`] is a create/update/delete intent that has been applied to
//! the local cache optimistically but not yet confirmed by the server.

use serde::{Deserialize, Serialize};

use crate::{Collection, OpId, Record, RecordId};

/// A write intent against one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Mutation {
    /// Create a record.
    Create {
        /// The record to create.
        record: Record,
    },
    /// Update a record in place.
    Update {
        /// The full new state of the record.
        record: Record,
    },
    /// Delete a record by id.
    Delete {
        /// Collection to delete from.
        collection: Collection,
        /// Id of the record to delete.
        id: RecordId,
    },
}

impl Mutation {
    /// The collection this mutation targets.
    pub fn collection(&self) -> Collection {
        match self {
            Mutation::Create { record } | Mutation::Update { record } => record.collection(),
            Mutation::Delete { collection, .. } => *collection,
        }
    }

    /// The id of the record this mutation targets.
    pub fn record_id(&self) -> RecordId {
        match self {
            Mutation::Create { record } | Mutation::Update { record } => record.id(),
            Mutation::Delete { id, .. } => *id,
        }
    }
}

/// A mutation waiting for server acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOp {
    /// Unique identifier for this queued operation.
    pub op_id: OpId,
    /// The write intent.
    pub mutation: Mutation,
    /// Unix timestamp when the operation was queued.
    pub queued_at: u64,
}

impl PendingOp {
    /// Create a new pending operation.
    pub fn new(mutation: Mutation, queued_at: u64) -> Self {
        Self {
            op_id: OpId::new(),
            mutation,
            queued_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Member;

    fn member_record() -> Record {
        Record::Member(Member {
            id: RecordId::new(),
            name: "Ana".to_string(),
            document: "12345678A".to_string(),
            phone: String::new(),
            email: String::new(),
            synced: false,
        })
    }

    #[test]
    fn mutation_targets() {
        let record = member_record();
        let id = record.id();

        let create = Mutation::Create { record };
        assert_eq!(create.collection(), Collection::Members);
        assert_eq!(create.record_id(), id);

        let delete = Mutation::Delete {
            collection: Collection::Teams,
            id,
        };
        assert_eq!(delete.collection(), Collection::Teams);
        assert_eq!(delete.record_id(), id);
    }

    #[test]
    fn pending_op_roundtrip() {
        let op = PendingOp::new(
            Mutation::Create {
                record: member_record(),
            },
            1_705_000_000,
        );

        let json = serde_json::to_string(&op).unwrap();
        let restored: PendingOp = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, op);
    }

    #[test]
    fn mutation_json_is_op_tagged() {
        let op = Mutation::Delete {
            collection: Collection::Friends,
            id: RecordId::new(),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "delete");
        assert_eq!(json["collection"], "friends");
    }
}
