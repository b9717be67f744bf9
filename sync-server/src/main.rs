//! clubsync-server binary entry point.
//!
//! Usage:
//! ```bash
//! clubsync-server --config clubsync.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clubsync_server::config::Config;
use clubsync_server::error::ServerError;
use clubsync_server::http::{self, build_router};
use clubsync_server::server::ClubServer;
use clubsync_server::storage::SqliteStorage;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = get_config_path();
    let config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        tracing::info!("no config file at {:?}, using defaults", config_path);
        Config::default()
    };

    let storage = SqliteStorage::new(&config.storage.database).await?;
    let server = Arc::new(ClubServer::new(config.clone(), storage));

    http::health::init_start_time();

    let router = build_router(Arc::clone(&server));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!("clubsync-server listening on {}", config.server.bind_address);

    axum::serve(listener, router).await?;
    Ok(())
}

fn get_config_path() -> PathBuf {
    std::env::args()
        .skip_while(|arg| arg != "--config")
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("clubsync.toml"))
}
