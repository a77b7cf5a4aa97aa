//! Entry model - a participant in the turn order

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One participant on the initiative board.
///
/// `id` and `is_monster` are fixed at creation; everything else may be
/// edited afterwards. Wire field names are camelCase to match the
/// established client protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: Uuid,
    pub name: String,
    /// Initiative roll; orders the board but is not required to be unique
    /// or positive.
    pub roll: i32,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    pub is_monster: bool,
    /// Hidden entries are skipped when advancing the turn and filtered out
    /// of player-facing views by the client.
    pub hidden: bool,
}

/// Payload for creating a player entry (`join-room`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlayer {
    pub name: String,
    pub roll: i32,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

/// Payload for creating a monster entry (`add-monster`)
///
/// Unlike players, monsters may start hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMonster {
    pub name: String,
    pub roll: i32,
    pub color: String,
    pub hidden: bool,
}

impl Entry {
    /// Create a player entry with a fresh id. Players are never monsters
    /// and never start hidden.
    pub fn player(new: NewPlayer) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            roll: new.roll,
            color: new.color,
            text_color: new.text_color,
            is_monster: false,
            hidden: false,
        }
    }

    /// Create a monster entry with a fresh id.
    pub fn monster(new: NewMonster) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            roll: new.roll,
            color: new.color,
            text_color: None,
            is_monster: true,
            hidden: new.hidden,
        }
    }
}
