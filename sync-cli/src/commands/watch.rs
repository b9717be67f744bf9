//! Run the full client lifecycle until interrupted.

use anyhow::Result;
use clubsync_client::ClientEvent;
use std::path::Path;

use crate::config::ClientProfile;

/// Run the watch command.
pub async fn run(data_dir: &Path) -> Result<()> {
    let profile = ClientProfile::load(data_dir).await?;
    let client = super::build_client(data_dir, &profile).await?;
    let mut events = client.subscribe();

    println!(
        "Watching {} as '{}' (Ctrl-C to stop)",
        profile.server_url, profile.client_name
    );

    client.start().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Stopping...");
                break;
            }
            event = events.recv() => {
                match event {
                    Ok(event) => print_event(&event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        println!("... skipped {} events", skipped);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    client.stop().await;
    println!(
        "Stopped. {} operation(s) still queued.",
        client.pending_count().await
    );

    Ok(())
}

fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::Online => println!("● online"),
        ClientEvent::Offline { reason } => println!("○ offline: {}", reason),
        ClientEvent::ConnectionFailed { error } => println!("○ connection failed: {}", error),
        ClientEvent::RetryFailed { attempt, error } => {
            println!("○ retry {} failed: {}", attempt, error)
        }
        ClientEvent::Suspended => println!("○ suspended until connectivity returns"),
        ClientEvent::SyncCompleted { fetched, failed } => {
            println!("⟳ sync: {} fetched, {} stale", fetched, failed)
        }
        ClientEvent::CollectionUpdated { collection, count } => {
            println!("  {} now has {} records", collection, count)
        }
        ClientEvent::QueueFlushed {
            delivered,
            remaining,
        } => println!("↑ queue: {} delivered, {} pending", delivered, remaining),
        ClientEvent::PushReceived { event } => println!("↓ server change: {:?}", event),
    }
}
