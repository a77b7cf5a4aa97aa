//! Network protocol message types
//!
//! All messages are JSON-serialized and length-prefixed on the wire. Tags
//! and field names follow the established client protocol: kebab-case event
//! names, camelCase payload fields.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use skirmish_core::{EncounterTemplate, Entry, NewMonster, NewPlayer, Room};

/// First frame on any connection.
///
/// `connect` upgrades to a persistent session; everything else is a
/// one-shot request answered by a single [`Response`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Request {
    /// Open a persistent session against a GM's room
    #[serde(rename_all = "camelCase")]
    Connect { gm_name: String, gm: bool },

    /// Create-or-login a GM session; idempotent room creation on success
    LoginGm { name: String, password: String },

    /// Directory of GMs currently running a session
    ListGms,

    /// The named GM's encounter templates
    #[serde(rename_all = "camelCase")]
    FetchEncounters { gm_name: String },

    /// Administrative room deletion (test cleanup)
    #[serde(rename_all = "camelCase")]
    DeleteRoom { gm_name: String },

    /// Effective host/port clients should use
    ServerConfig,
}

/// Reply to a one-shot [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Response {
    #[serde(rename_all = "camelCase")]
    LoginOk { gm_name: String },

    LoginFailed { message: String },

    GmList { gms: Vec<String> },

    EncounterList { encounters: Vec<EncounterTemplate> },

    RoomDeleted,

    ServerConfig { host: String, port: u16 },

    Error { message: String },
}

/// Session events, client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Add (or re-claim, for a reloading tab) a player entry
    JoinRoom(NewPlayer),

    /// Append a monster entry
    AddMonster(NewMonster),

    /// Replace the matching entry wholesale (self-service edits)
    UpdateEntry(Entry),

    /// GM drag-reorder
    ReorderEntries { from: usize, to: usize },

    /// Advance the turn pointer
    NextTurn,

    /// Delete an entry; players get kicked
    RemoveEntry { id: Uuid },

    /// Flip an entry's hidden flag
    ToggleHidden { id: Uuid },

    /// Descending sort by roll, preserving whose turn it is
    SortByInitiative,

    /// Empty the whole board and kick every player
    ClearAllPlayers,

    /// Apply a named encounter template
    #[serde(rename_all = "camelCase")]
    LoadEncounter {
        encounter_name: String,
        clear_room: bool,
        clear_players: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        clear_monsters: Option<bool>,
    },
}

/// Session events, server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Full room snapshot; sent immediately on join and after every
    /// mutation
    #[serde(rename_all = "camelCase")]
    RoomUpdate {
        entries: Vec<Entry>,
        current_turn_index: usize,
    },

    /// Targeted at a removed player's connection(s); the client is expected
    /// to navigate away and drop the connection
    Kicked,

    /// Connect-time rejection; the connection closes afterwards
    Error { message: String },
}

impl ServerEvent {
    /// Snapshot event for the given room state.
    pub fn room_update(room: &Room) -> Self {
        ServerEvent::RoomUpdate {
            entries: room.entries.clone(),
            current_turn_index: room.current_turn_index,
        }
    }
}
