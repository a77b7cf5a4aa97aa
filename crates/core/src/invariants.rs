//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible room states during
//! development. These checks are compiled out in release builds.

use std::collections::HashSet;

use crate::models::Room;

/// Validate that a Room's state is internally consistent
pub fn assert_room_invariants(room: &Room) {
    // Turn pointer must be in range whenever the board is non-empty
    debug_assert!(
        room.entries.is_empty() || room.current_turn_index < room.entries.len(),
        "Room {} turn index {} out of range for {} entries",
        room.key,
        room.current_turn_index,
        room.entries.len()
    );

    // Entry ids must be unique within the room
    let mut seen = HashSet::new();
    for entry in &room.entries {
        debug_assert!(
            seen.insert(entry.id),
            "Room {} has duplicate entry id {}",
            room.key,
            entry.id
        );
    }

    // Key must not be empty
    debug_assert!(!room.key.trim().is_empty(), "Room has empty key");
}
