//! Create a record locally and queue it for the server.

use anyhow::{Context, Result};
use clap::Subcommand;
use clubsync_types::{Event, Friend, Member, Player, Record, RecordId, Team};
use std::path::Path;
use std::str::FromStr;

use crate::config::ClientProfile;

/// Record types that can be created from the command line.
#[derive(Subcommand, Debug)]
pub enum AddCommand {
    /// Add a club member
    Member {
        /// Full name
        #[arg(long)]
        name: String,

        /// Identity document number
        #[arg(long)]
        document: String,

        /// Contact phone
        #[arg(long, default_value = "")]
        phone: String,

        /// Contact email
        #[arg(long, default_value = "")]
        email: String,
    },

    /// Add a team
    Team {
        /// Team name
        #[arg(long)]
        name: String,

        /// Age or league category
        #[arg(long, default_value = "")]
        category: String,
    },

    /// Add a player
    Player {
        /// Full name
        #[arg(long)]
        name: String,

        /// Jersey number
        #[arg(long, default_value_t = 0)]
        number: u32,

        /// Team id to scope the player to
        #[arg(long)]
        team_id: Option<String>,
    },

    /// Add a club event
    Event {
        /// Event title
        #[arg(long)]
        title: String,

        /// Where the event takes place
        #[arg(long, default_value = "")]
        venue: String,

        /// Unix timestamp of the start time
        #[arg(long, default_value_t = 0)]
        starts_at: i64,
    },

    /// Add a friend of the club
    Friend {
        /// Full name
        #[arg(long)]
        name: String,

        /// Contact phone
        #[arg(long, default_value = "")]
        phone: String,
    },
}

impl AddCommand {
    /// Build the record this command describes.
    pub fn into_record(self) -> Result<Record> {
        let record = match self {
            AddCommand::Member {
                name,
                document,
                phone,
                email,
            } => Record::Member(Member {
                id: RecordId::new(),
                name,
                document,
                phone,
                email,
                synced: false,
            }),
            AddCommand::Team { name, category } => Record::Team(Team {
                id: RecordId::new(),
                name,
                category,
                synced: false,
            }),
            AddCommand::Player {
                name,
                number,
                team_id,
            } => {
                let team_id = team_id
                    .map(|raw| RecordId::from_str(&raw))
                    .transpose()
                    .context("Invalid team id")?;
                Record::Player(Player {
                    id: RecordId::new(),
                    name,
                    number,
                    team_id,
                    synced: false,
                })
            }
            AddCommand::Event {
                title,
                venue,
                starts_at,
            } => Record::Event(Event {
                id: RecordId::new(),
                title,
                venue,
                starts_at,
                synced: false,
            }),
            AddCommand::Friend { name, phone } => Record::Friend(Friend {
                id: RecordId::new(),
                name,
                phone,
                synced: false,
            }),
        };
        Ok(record)
    }
}

/// Run the add command.
pub async fn run(data_dir: &Path, command: AddCommand) -> Result<()> {
    let profile = ClientProfile::load(data_dir).await?;
    let client = super::build_client(data_dir, &profile).await?;

    let record = command.into_record()?;
    let collection = record.collection();
    let id = client.create(record).await?;

    // Best effort: if the server is reachable the record is confirmed now,
    // otherwise it stays queued for the next sync.
    let flush = client.flush_pending().await;

    println!("Added {} record {}", collection, id);
    if flush.remaining == 0 {
        println!("Delivered to {}", profile.server_url);
    } else {
        println!("Server unreachable, {} operation(s) queued", flush.remaining);
    }

    Ok(())
}
