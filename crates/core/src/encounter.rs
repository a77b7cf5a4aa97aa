//! Encounter loader - applies pre-authored monster templates to a room
//!
//! A GM's directory profile carries named encounter templates. Loading one
//! optionally clears the board first (returning removed player ids so the
//! protocol layer can kick them), then appends the template's monsters,
//! rolling initiative for any descriptor that omits it.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::models::NewMonster;
use crate::store::RoomStore;

/// Initiative rolls drawn for monsters without an authored roll.
pub const ROLL_MIN: i32 = 7;
pub const ROLL_MAX: i32 = 27;

/// Color used when a monster descriptor omits one.
pub const DEFAULT_MONSTER_COLOR: &str = "#000000";

/// A single monster descriptor inside a template. Everything except the
/// name is optional in the authored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterTemplate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

/// A named, pre-authored list of monsters.
///
/// The wire/file field for the monster list is `encounter`, matching the
/// established GM file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterTemplate {
    pub name: String,
    #[serde(rename = "encounter")]
    pub monsters: Vec<MonsterTemplate>,
}

/// What to do with the existing board before the template is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearPolicy {
    None,
    ClearRoom,
    ClearPlayersOnly,
    ClearMonstersOnly,
}

impl ClearPolicy {
    /// Derive the policy from the `load-encounter` event flags. Clearing
    /// the whole room wins over the narrower options when several are set.
    pub fn from_flags(clear_room: bool, clear_players: bool, clear_monsters: bool) -> Self {
        if clear_room {
            ClearPolicy::ClearRoom
        } else if clear_players {
            ClearPolicy::ClearPlayersOnly
        } else if clear_monsters {
            ClearPolicy::ClearMonstersOnly
        } else {
            ClearPolicy::None
        }
    }
}

/// Result of applying a template.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Player ids removed by the clear policy; each owes its connections a
    /// kick.
    pub kicked_players: Vec<Uuid>,
    /// Number of monsters appended.
    pub added: usize,
}

/// Apply `template` to the room, clearing first per `policy`.
///
/// A no-op (empty outcome) when the room does not exist.
pub fn load_encounter(
    store: &mut RoomStore,
    key: &str,
    template: &EncounterTemplate,
    policy: ClearPolicy,
    rng: &mut impl Rng,
) -> LoadOutcome {
    if !store.has_room(key) {
        debug!(key, "load_encounter ignored: no such room");
        return LoadOutcome::default();
    }

    let kicked_players = match policy {
        ClearPolicy::None => Vec::new(),
        ClearPolicy::ClearRoom => store.clear_all_entries(key),
        ClearPolicy::ClearPlayersOnly => store.clear_players_only(key),
        ClearPolicy::ClearMonstersOnly => {
            let _ = store.clear_monsters_only(key);
            Vec::new()
        }
    };

    let mut added = 0;
    for monster in &template.monsters {
        let roll = monster
            .roll
            .unwrap_or_else(|| rng.gen_range(ROLL_MIN..=ROLL_MAX));
        let spawned = store.add_monster(
            key,
            NewMonster {
                name: monster.name.clone(),
                roll,
                color: monster
                    .color
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MONSTER_COLOR.to_string()),
                hidden: monster.hidden.unwrap_or(false),
            },
        );
        if spawned.is_some() {
            added += 1;
        }
    }

    debug!(key, template = %template.name, added, "encounter loaded");
    LoadOutcome {
        kicked_players,
        added,
    }
}
