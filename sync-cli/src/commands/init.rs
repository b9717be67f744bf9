//! Initialize the client profile.

use anyhow::Result;
use std::path::Path;

use crate::config::ClientProfile;

/// Run the init command.
pub async fn run(data_dir: &Path, name: &str, server: &str) -> Result<()> {
    if ClientProfile::exists(data_dir).await {
        let existing = ClientProfile::load(data_dir).await?;
        println!("Client already initialized:");
        println!("  ID:     {}", &existing.client_id[..16]);
        println!("  Name:   {}", existing.client_name);
        println!("  Server: {}", existing.server_url);
        return Ok(());
    }

    let profile = ClientProfile::new(name, server);
    profile.save(data_dir).await?;

    println!("Client initialized:");
    println!("  ID:     {}", &profile.client_id[..16]);
    println!("  Name:   {}", profile.client_name);
    println!("  Server: {}", profile.server_url);
    println!("  Data:   {}", data_dir.display());

    Ok(())
}
