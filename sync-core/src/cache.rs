//! Local-cache merge semantics.
//!
//! Pure functions over a [`Snapshot`] implementing the platform's
//! last-writer-wins cache contract: server reads overwrite a collection
//! wholesale; local mutations are applied optimistically and marked synced
//! once acknowledged. No conflict detection, no versioning.

use sync_types::{Collection, Mutation, Record, RecordId, Snapshot};

/// Overwrite one collection with server data.
///
/// Full replacement, not a merge: records present locally but absent from
/// `records` are dropped. Server data arrives acknowledged, so every record
/// is marked synced.
pub fn overwrite(snapshot: &mut Snapshot, collection: Collection, records: Vec<Record>) {
    let records = records
        .into_iter()
        .map(|mut r| {
            r.set_synced(true);
            r
        })
        .collect();
    snapshot.set_records(collection, records);
}

/// Insert or replace a record by id.
///
/// Returns `true` if an existing record was replaced.
pub fn upsert(snapshot: &mut Snapshot, record: Record) -> bool {
    let collection = record.collection();
    let mut records = snapshot.records(collection);

    let replaced = match records.iter().position(|r| r.id() == record.id()) {
        Some(index) => {
            records[index] = record;
            true
        }
        None => {
            records.push(record);
            false
        }
    };

    snapshot.set_records(collection, records);
    replaced
}

/// Remove a record by id.
///
/// Returns `true` if a record was removed.
pub fn remove(snapshot: &mut Snapshot, collection: Collection, id: RecordId) -> bool {
    let mut records = snapshot.records(collection);
    let before = records.len();
    records.retain(|r| r.id() != id);
    let removed = records.len() != before;
    snapshot.set_records(collection, records);
    removed
}

/// Find a record by id.
pub fn find(snapshot: &Snapshot, collection: Collection, id: RecordId) -> Option<Record> {
    snapshot
        .records(collection)
        .into_iter()
        .find(|r| r.id() == id)
}

/// Mark a record as acknowledged by the server.
///
/// Returns `true` if the record was found.
pub fn mark_synced(snapshot: &mut Snapshot, collection: Collection, id: RecordId) -> bool {
    let mut records = snapshot.records(collection);
    let mut found = false;
    for record in &mut records {
        if record.id() == id {
            record.set_synced(true);
            found = true;
        }
    }
    snapshot.set_records(collection, records);
    found
}

/// Apply an optimistic mutation to the local cache.
///
/// Creates and updates upsert the record as given (the caller decides the
/// synced flag); deletes remove by id. Deleting a record that is already
/// gone is a no-op, matching the idempotent server semantics.
pub fn apply(snapshot: &mut Snapshot, mutation: &Mutation) {
    match mutation {
        Mutation::Create { record } | Mutation::Update { record } => {
            upsert(snapshot, record.clone());
        }
        Mutation::Delete { collection, id } => {
            remove(snapshot, *collection, *id);
        }
    }
}
