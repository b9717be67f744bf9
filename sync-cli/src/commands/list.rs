//! List locally cached records.

use anyhow::{Context, Result};
use clubsync_types::{Collection, Record};
use std::path::Path;
use std::str::FromStr;

use crate::config::ClientProfile;

/// Run the list command.
pub async fn run(data_dir: &Path, collection: &str) -> Result<()> {
    let collection = Collection::from_str(collection)
        .with_context(|| format!("Unknown collection '{}'", collection))?;

    let profile = ClientProfile::load(data_dir).await?;
    let client = super::build_client(data_dir, &profile).await?;

    let records = client.records(collection).await;
    if records.is_empty() {
        println!("No {} in the local cache", collection);
        return Ok(());
    }

    println!("{} ({} records):", collection, records.len());
    for record in &records {
        println!("  {} {}  {}", sync_marker(record), record.id(), label(record));
    }
    println!();
    println!("(✓ confirmed by server, ~ pending delivery)");

    Ok(())
}

fn sync_marker(record: &Record) -> char {
    if record.synced() {
        '✓'
    } else {
        '~'
    }
}

fn label(record: &Record) -> String {
    match record {
        Record::Member(m) => format!("{} ({})", m.name, m.document),
        Record::Team(t) => {
            if t.category.is_empty() {
                t.name.clone()
            } else {
                format!("{} [{}]", t.name, t.category)
            }
        }
        Record::Player(p) => format!("{} #{}", p.name, p.number),
        Record::Event(e) => {
            if e.venue.is_empty() {
                e.title.clone()
            } else {
                format!("{} @ {}", e.title, e.venue)
            }
        }
        Record::Friend(f) => f.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubsync_types::{Member, RecordId};

    #[test]
    fn labels_are_readable() {
        let record = Record::Member(Member {
            id: RecordId::new(),
            name: "Ana Garcia".to_string(),
            document: "12345678A".to_string(),
            phone: String::new(),
            email: String::new(),
            synced: false,
        });

        assert_eq!(label(&record), "Ana Garcia (12345678A)");
        assert_eq!(sync_marker(&record), '~');
    }

    #[tokio::test]
    async fn list_unknown_collection_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(dir.path(), "payments").await;
        assert!(result.is_err());
    }
}
