//! Configuration management for clubsync-cli.

use anyhow::{Context, Result};
use clubsync_types::ClientId;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Client profile stored locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientProfile {
    /// Unique client identifier.
    pub client_id: String,
    /// Human-readable client name.
    pub client_name: String,
    /// Base URL of the sync server.
    pub server_url: String,
    /// When the profile was initialized.
    pub created_at: u64,
}

impl ClientProfile {
    /// Create a new client profile.
    pub fn new(name: &str, server_url: &str) -> Self {
        Self {
            client_id: ClientId::random().to_string(),
            client_name: name.to_string(),
            server_url: server_url.trim_end_matches('/').to_string(),
            created_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }

    /// Load the client profile from a directory.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("client.json");
        let contents = tokio::fs::read_to_string(&path)
            .await
            .context("Client not initialized. Run 'clubsync init' first.")?;
        serde_json::from_str(&contents).context("Invalid client profile")
    }

    /// Save the client profile to a directory.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join("client.json");
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, contents)
            .await
            .context("Failed to save client profile")?;
        Ok(())
    }

    /// Check if the client is initialized.
    pub async fn exists(data_dir: &Path) -> bool {
        data_dir.join("client.json").exists()
    }
}
