//! Run the sync server.

use anyhow::{Context, Result};
use clubsync_server::config::Config;
use clubsync_server::http::{self, build_router};
use clubsync_server::server::ClubServer;
use clubsync_server::storage::SqliteStorage;
use std::path::Path;
use std::sync::Arc;

/// Run the serve command.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let storage = SqliteStorage::new(&config.storage.database)
        .await
        .context("Failed to open database")?;
    let server = Arc::new(ClubServer::new(config.clone(), storage));

    http::health::init_start_time();

    let router = build_router(Arc::clone(&server));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;

    println!("clubsync-server listening on {}", config.server.bind_address);
    println!("Ctrl-C to stop");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Server error")?;

    Ok(())
}
