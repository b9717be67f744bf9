//! CLI command implementations.

pub mod add;
pub mod init;
pub mod list;
pub mod remove;
pub mod serve;
pub mod status;
pub mod sync;
pub mod watch;

use anyhow::Result;
use clubsync_client::{HttpTransport, LocalStore, SyncClient, SyncConfig};
use std::path::Path;

use crate::config::ClientProfile;

/// Build a sync client for the stored profile.
pub(crate) async fn build_client(
    data_dir: &Path,
    profile: &ClientProfile,
) -> Result<SyncClient<HttpTransport>> {
    let config = SyncConfig::new(&profile.server_url).with_client_name(&profile.client_name);
    let transport = HttpTransport::new(&profile.server_url)?;
    let store = LocalStore::new(data_dir);
    let client = SyncClient::new(config, transport, store).await?;
    Ok(client)
}
