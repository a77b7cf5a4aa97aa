//! Room model - one per active GM session

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Entry;

/// A GM's turn-order board.
///
/// The order of `entries` IS the turn order: insertion order by default,
/// changed only by explicit reorder or sort. `current_turn_index` points at
/// the active entry and is meaningless while the board is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub key: String,
    pub entries: Vec<Entry>,
    pub current_turn_index: usize,
}

impl Room {
    pub fn new(key: String) -> Self {
        Self {
            key,
            entries: Vec::new(),
            current_turn_index: 0,
        }
    }

    /// The entry whose turn it currently is, if any.
    pub fn current_entry(&self) -> Option<&Entry> {
        self.entries.get(self.current_turn_index)
    }

    pub fn entry_by_id(&self, id: Uuid) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn position_of(&self, id: Uuid) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }
}
