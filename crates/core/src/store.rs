//! Room store - authoritative in-memory state for all rooms
//!
//! The store is the only component allowed to mutate Room data. All
//! operations are synchronous; callers are expected to hold whatever lock
//! guards the store across a full read-mutate-broadcast sequence.
//!
//! Operations against an unknown room key (or entry id) are deliberately
//! not errors: they return [`Outcome::Ignored`] and log at `debug`, so the
//! protocol layer only has to validate the room once, at connect time.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::invariants::assert_room_invariants;
use crate::models::{Entry, NewMonster, NewPlayer, Room};

/// Result of a store mutation.
///
/// `Ignored` means the room or entry did not exist (or the request was
/// invalid, e.g. an out-of-range reorder) and nothing changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Outcome {
    Applied,
    Ignored,
}

impl Outcome {
    pub fn applied(self) -> bool {
        self == Outcome::Applied
    }
}

/// In-memory map of room key to turn-order state.
#[derive(Debug, Default)]
pub struct RoomStore {
    rooms: HashMap<String, Room>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room if absent. Idempotent: re-invoking for an existing key
    /// leaves the room's entries untouched, so a GM can reconnect without
    /// losing board state.
    pub fn create_room(&mut self, key: &str) {
        self.rooms
            .entry(key.to_string())
            .or_insert_with(|| Room::new(key.to_string()));
    }

    pub fn has_room(&self, key: &str) -> bool {
        self.rooms.contains_key(key)
    }

    /// Read-only view of a room, used as the broadcast snapshot source.
    pub fn state(&self, key: &str) -> Option<&Room> {
        self.rooms.get(key)
    }

    /// Keys of all rooms currently running, sorted for stable listings.
    pub fn active_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.rooms.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Append a player entry. Returns the created entry so the caller can
    /// associate it with a connection.
    pub fn add_player(&mut self, key: &str, new: NewPlayer) -> Option<Entry> {
        let Some(room) = self.rooms.get_mut(key) else {
            debug!(key, "add_player ignored: no such room");
            return None;
        };
        let entry = Entry::player(new);
        room.entries.push(entry.clone());
        assert_room_invariants(room);
        Some(entry)
    }

    /// Append a monster entry. Monsters may start hidden.
    pub fn add_monster(&mut self, key: &str, new: NewMonster) -> Option<Entry> {
        let Some(room) = self.rooms.get_mut(key) else {
            debug!(key, "add_monster ignored: no such room");
            return None;
        };
        let entry = Entry::monster(new);
        room.entries.push(entry.clone());
        assert_room_invariants(room);
        Some(entry)
    }

    /// Replace the entry matching `updated.id` in place.
    pub fn update_entry(&mut self, key: &str, updated: Entry) -> Outcome {
        let Some(room) = self.rooms.get_mut(key) else {
            debug!(key, "update_entry ignored: no such room");
            return Outcome::Ignored;
        };
        match room.entries.iter_mut().find(|e| e.id == updated.id) {
            Some(slot) => {
                *slot = updated;
                Outcome::Applied
            }
            None => {
                debug!(key, id = %updated.id, "update_entry ignored: no such entry");
                Outcome::Ignored
            }
        }
    }

    /// Delete the entry with the given id.
    ///
    /// `current_turn_index` is explicitly re-clamped: removing an entry
    /// before it shifts it down by one so the same entry stays current;
    /// removing the last entry while it is current wraps the pointer to 0.
    pub fn remove_entry(&mut self, key: &str, id: Uuid) -> Outcome {
        let Some(room) = self.rooms.get_mut(key) else {
            debug!(key, "remove_entry ignored: no such room");
            return Outcome::Ignored;
        };
        let Some(pos) = room.position_of(id) else {
            debug!(key, %id, "remove_entry ignored: no such entry");
            return Outcome::Ignored;
        };
        room.entries.remove(pos);
        if room.entries.is_empty() {
            room.current_turn_index = 0;
        } else {
            if pos < room.current_turn_index {
                room.current_turn_index -= 1;
            }
            if room.current_turn_index >= room.entries.len() {
                room.current_turn_index = 0;
            }
        }
        assert_room_invariants(room);
        Outcome::Applied
    }

    /// Move the entry at `from` to position `to`, shifting the others.
    /// Out-of-range indices are rejected.
    pub fn reorder_entries(&mut self, key: &str, from: usize, to: usize) -> Outcome {
        let Some(room) = self.rooms.get_mut(key) else {
            debug!(key, "reorder_entries ignored: no such room");
            return Outcome::Ignored;
        };
        if from >= room.entries.len() || to >= room.entries.len() {
            debug!(key, from, to, "reorder_entries ignored: index out of range");
            return Outcome::Ignored;
        }
        let moved = room.entries.remove(from);
        room.entries.insert(to, moved);
        assert_room_invariants(room);
        Outcome::Applied
    }

    /// Advance the turn pointer to the next non-hidden entry, wrapping
    /// modulo the entry count. A no-op on an empty board or when every
    /// entry is hidden.
    pub fn next_turn(&mut self, key: &str) -> Outcome {
        let Some(room) = self.rooms.get_mut(key) else {
            debug!(key, "next_turn ignored: no such room");
            return Outcome::Ignored;
        };
        let total = room.entries.len();
        if total == 0 {
            debug!(key, "next_turn ignored: empty room");
            return Outcome::Ignored;
        }
        // Try each subsequent index until we hit a non-hidden entry.
        for step in 1..=total {
            let candidate = (room.current_turn_index + step) % total;
            if !room.entries[candidate].hidden {
                room.current_turn_index = candidate;
                break;
            }
        }
        assert_room_invariants(room);
        Outcome::Applied
    }

    /// Flip the hidden flag on the matching entry.
    pub fn toggle_hidden(&mut self, key: &str, id: Uuid) -> Outcome {
        let Some(room) = self.rooms.get_mut(key) else {
            debug!(key, "toggle_hidden ignored: no such room");
            return Outcome::Ignored;
        };
        match room.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.hidden = !entry.hidden;
                Outcome::Applied
            }
            None => {
                debug!(key, %id, "toggle_hidden ignored: no such entry");
                Outcome::Ignored
            }
        }
    }

    /// Stably sort entries descending by initiative roll, keeping "whose
    /// turn it is" pinned to the same entry across the sort. If the current
    /// entry vanished concurrently, the pointer falls back to 0.
    pub fn sort_by_initiative(&mut self, key: &str) -> Outcome {
        let Some(room) = self.rooms.get_mut(key) else {
            debug!(key, "sort_by_initiative ignored: no such room");
            return Outcome::Ignored;
        };
        let current_id = room.current_entry().map(|e| e.id);
        room.entries.sort_by(|a, b| b.roll.cmp(&a.roll));
        room.current_turn_index = current_id
            .and_then(|id| room.position_of(id))
            .unwrap_or(0);
        assert_room_invariants(room);
        Outcome::Applied
    }

    /// Empty the board entirely, monsters included, and reset the turn
    /// pointer. Returns the ids of removed *player* entries so the protocol
    /// layer can issue kicks.
    pub fn clear_all_entries(&mut self, key: &str) -> Vec<Uuid> {
        let Some(room) = self.rooms.get_mut(key) else {
            debug!(key, "clear_all_entries ignored: no such room");
            return Vec::new();
        };
        let players = room
            .entries
            .iter()
            .filter(|e| !e.is_monster)
            .map(|e| e.id)
            .collect();
        room.entries.clear();
        room.current_turn_index = 0;
        players
    }

    /// Remove only player entries, keeping monsters in place. Returns the
    /// removed player ids for kicks.
    pub fn clear_players_only(&mut self, key: &str) -> Vec<Uuid> {
        let Some(room) = self.rooms.get_mut(key) else {
            debug!(key, "clear_players_only ignored: no such room");
            return Vec::new();
        };
        let current_id = room.current_entry().map(|e| e.id);
        let players = room
            .entries
            .iter()
            .filter(|e| !e.is_monster)
            .map(|e| e.id)
            .collect();
        room.entries.retain(|e| e.is_monster);
        room.current_turn_index = current_id
            .and_then(|id| room.position_of(id))
            .unwrap_or(0);
        assert_room_invariants(room);
        players
    }

    /// Remove only monster entries.
    pub fn clear_monsters_only(&mut self, key: &str) -> Outcome {
        let Some(room) = self.rooms.get_mut(key) else {
            debug!(key, "clear_monsters_only ignored: no such room");
            return Outcome::Ignored;
        };
        let current_id = room.current_entry().map(|e| e.id);
        room.entries.retain(|e| !e.is_monster);
        room.current_turn_index = current_id
            .and_then(|id| room.position_of(id))
            .unwrap_or(0);
        assert_room_invariants(room);
        Outcome::Applied
    }

    pub fn entry_by_id(&self, key: &str, id: Uuid) -> Option<&Entry> {
        self.rooms.get(key).and_then(|room| room.entry_by_id(id))
    }

    /// Id of an existing non-hidden player entry matching `(name, color)`.
    /// Lets a reloading browser tab reclaim its seat instead of creating a
    /// ghost entry.
    pub fn find_returning_player(&self, key: &str, name: &str, color: &str) -> Option<Uuid> {
        let room = self.rooms.get(key)?;
        room.entries
            .iter()
            .find(|e| !e.is_monster && !e.hidden && e.name == name && e.color == color)
            .map(|e| e.id)
    }

    /// Remove the room entirely. Administrative cleanup only; rooms are
    /// never auto-deleted when their last connection drops.
    pub fn delete_room(&mut self, key: &str) -> Outcome {
        match self.rooms.remove(key) {
            Some(_) => Outcome::Applied,
            None => {
                debug!(key, "delete_room ignored: no such room");
                Outcome::Ignored
            }
        }
    }
}
