//! Run one sync pass.

use anyhow::Result;
use clubsync_types::Collection;
use std::path::Path;

use crate::config::ClientProfile;

/// Run the sync command.
pub async fn run(data_dir: &Path, push_snapshot: bool) -> Result<()> {
    let profile = ClientProfile::load(data_dir).await?;
    let client = super::build_client(data_dir, &profile).await?;

    if push_snapshot {
        client.push_snapshot().await?;
        println!(
            "Replaced server collections with the local snapshot ({} records)",
            client.snapshot().await.total()
        );
        return Ok(());
    }

    let report = client.sync().await;

    if report.transport_down {
        println!("Server unreachable - local cache left as-is");
    } else {
        println!(
            "Synced {} collection(s), {} left stale",
            report.fetched, report.failed
        );
    }
    println!(
        "Queue: {} delivered, {} still pending",
        report.flush.delivered, report.flush.remaining
    );

    let snapshot = client.snapshot().await;
    for collection in Collection::ALL {
        println!("  {:<8} {}", collection.to_string(), snapshot.len(collection));
    }

    Ok(())
}
