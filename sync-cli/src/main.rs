//! # clubsync-cli
//!
//! Operator CLI for the Clubsync platform.
//!
//! ## Commands
//!
//! - `init`: Initialize the client profile
//! - `add`: Create a record locally and queue it for the server
//! - `list`: List locally cached records
//! - `remove`: Delete a record locally and queue the remote delete
//! - `sync`: Run one sync pass
//! - `watch`: Run the full client lifecycle, printing events
//! - `status`: Show profile, cache and queue state
//! - `serve`: Run the sync server
//!
//! ## Example
//!
//! ```bash
//! # Initialize the client
//! clubsync init --name "Front desk"
//!
//! # Create a member (works offline, queued until the server is reachable)
//! clubsync add member --name "Ana Garcia" --document 12345678A
//!
//! # Sync with the server
//! clubsync sync
//!
//! # Keep syncing until interrupted
//! clubsync watch
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::{add, init, list, remove, serve, status, sync, watch};

/// Operator CLI for the Clubsync platform.
#[derive(Parser, Debug)]
#[command(name = "clubsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for the client profile and local cache
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize the client profile
    Init {
        /// Client name
        #[arg(long, short)]
        name: String,

        /// Server base URL
        #[arg(long, default_value = "http://localhost:8080")]
        server: String,
    },

    /// Create a record locally and queue it for the server
    Add {
        #[command(subcommand)]
        record: add::AddCommand,
    },

    /// List locally cached records of one collection
    List {
        /// Collection name (members, teams, players, events, friends)
        collection: String,
    },

    /// Delete a record locally and queue the remote delete
    Remove {
        /// Collection name
        collection: String,

        /// Record id
        id: String,
    },

    /// Run one sync pass against the server
    Sync {
        /// Replace the server-side collections with the local snapshot
        /// instead of pulling
        #[arg(long)]
        push_snapshot: bool,
    },

    /// Run the client until interrupted, printing events
    Watch,

    /// Show profile, cache and queue state
    Status,

    /// Run the sync server
    Serve {
        /// Path to the server TOML configuration
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    match cli.command {
        Commands::Init { name, server } => {
            init::run(&data_dir, &name, &server).await?;
        }
        Commands::Add { record } => {
            add::run(&data_dir, record).await?;
        }
        Commands::List { collection } => {
            list::run(&data_dir, &collection).await?;
        }
        Commands::Remove { collection, id } => {
            remove::run(&data_dir, &collection, &id).await?;
        }
        Commands::Sync { push_snapshot } => {
            sync::run(&data_dir, push_snapshot).await?;
        }
        Commands::Watch => {
            watch::run(&data_dir).await?;
        }
        Commands::Status => {
            status::run(&data_dir).await?;
        }
        Commands::Serve { config } => {
            serve::run(config.as_deref()).await?;
        }
    }

    Ok(())
}

/// Get the default data directory for clubsync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "clubsync", "clubsync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
