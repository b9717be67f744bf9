//! Show profile, cache and queue state.

use anyhow::Result;
use clubsync_types::Collection;
use std::path::Path;

use crate::config::ClientProfile;

/// Run the status command.
pub async fn run(data_dir: &Path) -> Result<()> {
    println!("=== clubsync status ===");
    println!();

    let profile = match ClientProfile::load(data_dir).await {
        Ok(profile) => {
            println!("Client:");
            println!("  ID:     {}", &profile.client_id[..16]);
            println!("  Name:   {}", profile.client_name);
            println!("  Server: {}", profile.server_url);
            println!("  Init:   {}", format_timestamp(profile.created_at));
            profile
        }
        Err(_) => {
            println!("Client: NOT INITIALIZED");
            println!();
            println!("Run 'clubsync init --name <name>' to initialize.");
            return Ok(());
        }
    };

    println!();

    let client = super::build_client(data_dir, &profile).await?;
    let snapshot = client.snapshot().await;

    println!("Local cache:");
    for collection in Collection::ALL {
        let records = snapshot.records(collection);
        let pending = records.iter().filter(|r| !r.synced()).count();
        if pending > 0 {
            println!(
                "  {:<8} {} ({} pending)",
                collection.to_string(),
                records.len(),
                pending
            );
        } else {
            println!("  {:<8} {}", collection.to_string(), records.len());
        }
    }

    println!();
    println!("Queue:  {} operation(s) pending", client.pending_count().await);
    match client.last_sync().await {
        Some(timestamp) => println!("Synced: {}", format_timestamp(timestamp)),
        None => println!("Synced: never"),
    }

    Ok(())
}

/// Format a Unix timestamp as a human-readable string.
fn format_timestamp(ts: u64) -> String {
    // Simple formatting without external dependencies
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let diff = now.saturating_sub(ts);

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}
