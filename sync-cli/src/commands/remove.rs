//! Delete a record locally and queue the remote delete.

use anyhow::{Context, Result};
use clubsync_types::{Collection, RecordId};
use std::path::Path;
use std::str::FromStr;

use crate::config::ClientProfile;

/// Run the remove command.
pub async fn run(data_dir: &Path, collection: &str, id: &str) -> Result<()> {
    let collection = Collection::from_str(collection)
        .with_context(|| format!("Unknown collection '{}'", collection))?;
    let id = RecordId::from_str(id).with_context(|| format!("Invalid record id '{}'", id))?;

    let profile = ClientProfile::load(data_dir).await?;
    let client = super::build_client(data_dir, &profile).await?;

    client.delete(collection, id).await?;
    let flush = client.flush_pending().await;

    println!("Removed {} record {}", collection, id);
    if flush.remaining == 0 {
        println!("Delivered to {}", profile.server_url);
    } else {
        println!("Server unreachable, {} operation(s) queued", flush.remaining);
    }

    Ok(())
}
