//! Domain records for the club platform.
//!
//! Five flat record types (members, teams, players, events, friends), a
//! [`Collection`] enum naming them, and a [`Record`] enum that unifies them
//! for generic plumbing (queueing, caching, transport).
//!
//! Every record carries a client-local `synced` flag indicating whether the
//! server has acknowledged it. The flag never crosses the wire: outbound
//! bodies strip it ([`Record::wire_value`]) and inbound bodies default it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{RecordId, SyncError};

/// The five record collections managed by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Club members.
    Members,
    /// Teams.
    Teams,
    /// Players (optionally scoped to a team).
    Players,
    /// Club events.
    Events,
    /// Friends of the club.
    Friends,
}

impl Collection {
    /// All collections, in sync order.
    pub const ALL: [Collection; 5] = [
        Collection::Members,
        Collection::Teams,
        Collection::Players,
        Collection::Events,
        Collection::Friends,
    ];

    /// The URL path segment for this collection (`/api/<segment>`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Members => "members",
            Collection::Teams => "teams",
            Collection::Players => "players",
            Collection::Events => "events",
            Collection::Friends => "friends",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "members" => Ok(Collection::Members),
            "teams" => Ok(Collection::Teams),
            "players" => Ok(Collection::Players),
            "events" => Ok(Collection::Events),
            "friends" => Ok(Collection::Friends),
            other => Err(SyncError::UnknownCollection(other.to_string())),
        }
    }
}

/// A club member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Record identifier.
    pub id: RecordId,
    /// Full name.
    pub name: String,
    /// Identity document number.
    pub document: String,
    /// Contact phone.
    #[serde(default)]
    pub phone: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Whether the server has acknowledged this record (client-local).
    #[serde(default)]
    pub synced: bool,
}

/// A team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Record identifier.
    pub id: RecordId,
    /// Team name.
    pub name: String,
    /// Age or league category.
    #[serde(default)]
    pub category: String,
    /// Whether the server has acknowledged this record (client-local).
    #[serde(default)]
    pub synced: bool,
}

/// A player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Record identifier.
    pub id: RecordId,
    /// Full name.
    pub name: String,
    /// Jersey number.
    #[serde(default)]
    pub number: u32,
    /// Team this player belongs to, if any. Informal foreign key; no
    /// referential integrity is enforced.
    #[serde(default)]
    pub team_id: Option<RecordId>,
    /// Whether the server has acknowledged this record (client-local).
    #[serde(default)]
    pub synced: bool,
}

/// A club event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Record identifier.
    pub id: RecordId,
    /// Event title.
    pub title: String,
    /// Where the event takes place.
    #[serde(default)]
    pub venue: String,
    /// Unix timestamp of the start time.
    #[serde(default)]
    pub starts_at: i64,
    /// Whether the server has acknowledged this record (client-local).
    #[serde(default)]
    pub synced: bool,
}

/// A friend of the club.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    /// Record identifier.
    pub id: RecordId,
    /// Full name.
    pub name: String,
    /// Contact phone.
    #[serde(default)]
    pub phone: String,
    /// Whether the server has acknowledged this record (client-local).
    #[serde(default)]
    pub synced: bool,
}

/// A record from any collection.
///
/// Tagged by collection so queued operations and persisted files are
/// self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "collection")]
pub enum Record {
    /// A member record.
    #[serde(rename = "members")]
    Member(Member),
    /// A team record.
    #[serde(rename = "teams")]
    Team(Team),
    /// A player record.
    #[serde(rename = "players")]
    Player(Player),
    /// An event record.
    #[serde(rename = "events")]
    Event(Event),
    /// A friend record.
    #[serde(rename = "friends")]
    Friend(Friend),
}

impl Record {
    /// The collection this record belongs to.
    pub fn collection(&self) -> Collection {
        match self {
            Record::Member(_) => Collection::Members,
            Record::Team(_) => Collection::Teams,
            Record::Player(_) => Collection::Players,
            Record::Event(_) => Collection::Events,
            Record::Friend(_) => Collection::Friends,
        }
    }

    /// The record identifier.
    pub fn id(&self) -> RecordId {
        match self {
            Record::Member(r) => r.id,
            Record::Team(r) => r.id,
            Record::Player(r) => r.id,
            Record::Event(r) => r.id,
            Record::Friend(r) => r.id,
        }
    }

    /// Whether the server has acknowledged this record.
    pub fn synced(&self) -> bool {
        match self {
            Record::Member(r) => r.synced,
            Record::Team(r) => r.synced,
            Record::Player(r) => r.synced,
            Record::Event(r) => r.synced,
            Record::Friend(r) => r.synced,
        }
    }

    /// Set the client-local synced flag.
    pub fn set_synced(&mut self, synced: bool) {
        match self {
            Record::Member(r) => r.synced = synced,
            Record::Team(r) => r.synced = synced,
            Record::Player(r) => r.synced = synced,
            Record::Event(r) => r.synced = synced,
            Record::Friend(r) => r.synced = synced,
        }
    }

    /// Parse a plain (untagged) entity body received from the server.
    pub fn from_value(
        collection: Collection,
        value: serde_json::Value,
    ) -> Result<Self, SyncError> {
        let record = match collection {
            Collection::Members => Record::Member(serde_json::from_value(value)?),
            Collection::Teams => Record::Team(serde_json::from_value(value)?),
            Collection::Players => Record::Player(serde_json::from_value(value)?),
            Collection::Events => Record::Event(serde_json::from_value(value)?),
            Collection::Friends => Record::Friend(serde_json::from_value(value)?),
        };
        Ok(record)
    }

    /// Serialize to a plain entity body for the wire.
    ///
    /// Drops the enum tag and the client-local `synced` flag.
    pub fn wire_value(&self) -> Result<serde_json::Value, SyncError> {
        let mut value = match self {
            Record::Member(r) => serde_json::to_value(r)?,
            Record::Team(r) => serde_json::to_value(r)?,
            Record::Player(r) => serde_json::to_value(r)?,
            Record::Event(r) => serde_json::to_value(r)?,
            Record::Friend(r) => serde_json::to_value(r)?,
        };
        if let Some(map) = value.as_object_mut() {
            map.remove("synced");
        }
        Ok(value)
    }
}

/// A full set of the five collections.
///
/// Used as the client's local cache and as the body of the wholesale
/// `/api/sync` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Members collection.
    #[serde(default)]
    pub members: Vec<Member>,
    /// Teams collection.
    #[serde(default)]
    pub teams: Vec<Team>,
    /// Players collection.
    #[serde(default)]
    pub players: Vec<Player>,
    /// Events collection.
    #[serde(default)]
    pub events: Vec<Event>,
    /// Friends collection.
    #[serde(default)]
    pub friends: Vec<Friend>,
}

impl Snapshot {
    /// Get one collection as generic records.
    pub fn records(&self, collection: Collection) -> Vec<Record> {
        match collection {
            Collection::Members => self.members.iter().cloned().map(Record::Member).collect(),
            Collection::Teams => self.teams.iter().cloned().map(Record::Team).collect(),
            Collection::Players => self.players.iter().cloned().map(Record::Player).collect(),
            Collection::Events => self.events.iter().cloned().map(Record::Event).collect(),
            Collection::Friends => self.friends.iter().cloned().map(Record::Friend).collect(),
        }
    }

    /// Replace one collection from generic records.
    ///
    /// Records tagged for a different collection are skipped.
    pub fn set_records(&mut self, collection: Collection, records: Vec<Record>) {
        match collection {
            Collection::Members => {
                self.members = records
                    .into_iter()
                    .filter_map(|r| match r {
                        Record::Member(m) => Some(m),
                        _ => None,
                    })
                    .collect();
            }
            Collection::Teams => {
                self.teams = records
                    .into_iter()
                    .filter_map(|r| match r {
                        Record::Team(t) => Some(t),
                        _ => None,
                    })
                    .collect();
            }
            Collection::Players => {
                self.players = records
                    .into_iter()
                    .filter_map(|r| match r {
                        Record::Player(p) => Some(p),
                        _ => None,
                    })
                    .collect();
            }
            Collection::Events => {
                self.events = records
                    .into_iter()
                    .filter_map(|r| match r {
                        Record::Event(e) => Some(e),
                        _ => None,
                    })
                    .collect();
            }
            Collection::Friends => {
                self.friends = records
                    .into_iter()
                    .filter_map(|r| match r {
                        Record::Friend(f) => Some(f),
                        _ => None,
                    })
                    .collect();
            }
        }
    }

    /// Number of records in one collection.
    pub fn len(&self, collection: Collection) -> usize {
        match collection {
            Collection::Members => self.members.len(),
            Collection::Teams => self.teams.len(),
            Collection::Players => self.players.len(),
            Collection::Events => self.events.len(),
            Collection::Friends => self.friends.len(),
        }
    }

    /// Total number of records across all collections.
    pub fn total(&self) -> usize {
        Collection::ALL.iter().map(|c| self.len(*c)).sum()
    }

    /// Whether every collection is empty.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str) -> Member {
        Member {
            id: RecordId::new(),
            name: name.to_string(),
            document: "12345678A".to_string(),
            phone: "600111222".to_string(),
            email: format!("{}@club.example", name.to_lowercase()),
            synced: false,
        }
    }

    #[test]
    fn collection_path_segments() {
        assert_eq!(Collection::Members.as_str(), "members");
        assert_eq!(Collection::Friends.to_string(), "friends");
    }

    #[test]
    fn collection_from_str_roundtrip() {
        for c in Collection::ALL {
            let parsed: Collection = c.as_str().parse().unwrap();
            assert_eq!(parsed, c);
        }
    }

    #[test]
    fn collection_from_str_rejects_unknown() {
        let result: Result<Collection, _> = "payments".parse();
        assert!(matches!(result, Err(SyncError::UnknownCollection(_))));
    }

    #[test]
    fn record_enum_is_collection_tagged() {
        let record = Record::Member(member("Ana"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["collection"], "members");
        assert_eq!(json["name"], "Ana");

        let restored: Record = serde_json::from_value(json).unwrap();
        assert_eq!(restored, record);
    }

    #[test]
    fn wire_value_strips_synced_and_tag() {
        let mut m = member("Ana");
        m.synced = true;
        let record = Record::Member(m);

        let wire = record.wire_value().unwrap();
        assert!(wire.get("synced").is_none());
        assert!(wire.get("collection").is_none());
        assert_eq!(wire["name"], "Ana");
    }

    #[test]
    fn from_value_defaults_synced() {
        let wire = serde_json::json!({
            "id": RecordId::new().to_string(),
            "name": "Ana",
            "document": "12345678A",
        });

        let record = Record::from_value(Collection::Members, wire).unwrap();
        assert!(!record.synced());
        assert_eq!(record.collection(), Collection::Members);
    }

    #[test]
    fn from_value_rejects_malformed_body() {
        let wire = serde_json::json!({ "unexpected": true });
        let result = Record::from_value(Collection::Members, wire);
        assert!(matches!(result, Err(SyncError::Serialization(_))));
    }

    #[test]
    fn snapshot_set_and_get_records() {
        let mut snapshot = Snapshot::default();
        let records = vec![
            Record::Member(member("Ana")),
            Record::Member(member("Luis")),
        ];

        snapshot.set_records(Collection::Members, records.clone());

        assert_eq!(snapshot.records(Collection::Members), records);
        assert_eq!(snapshot.len(Collection::Members), 2);
        assert_eq!(snapshot.total(), 2);
    }

    #[test]
    fn snapshot_set_skips_mismatched_collections() {
        let mut snapshot = Snapshot::default();
        snapshot.set_records(
            Collection::Teams,
            vec![Record::Member(member("Ana"))],
        );
        assert_eq!(snapshot.len(Collection::Teams), 0);
    }

    #[test]
    fn empty_snapshot_is_empty() {
        assert!(Snapshot::default().is_empty());
    }

    #[test]
    fn player_team_id_roundtrips() {
        let team_id = RecordId::new();
        let player = Player {
            id: RecordId::new(),
            name: "Marta".to_string(),
            number: 9,
            team_id: Some(team_id),
            synced: false,
        };

        let json = serde_json::to_value(&player).unwrap();
        let restored: Player = serde_json::from_value(json).unwrap();
        assert_eq!(restored.team_id, Some(team_id));
    }
}
