//! Identity tracker - which live connection speaks for which entry
//!
//! A kick has to reach the specific connection(s) representing a removed
//! entry, so the tracker keeps a bidirectional map: each connection stands
//! for at most one entry, while one entry may be open in several tabs or
//! devices at once.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

/// Opaque identifier for a live connection.
pub type ConnId = Uuid;

#[derive(Debug, Default)]
pub struct IdentityTracker {
    by_conn: HashMap<ConnId, Uuid>,
    by_entry: HashMap<Uuid, HashSet<ConnId>>,
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a connection with an entry. A connection previously
    /// tracked to a different entry is moved, not duplicated: re-join
    /// replaces.
    pub fn track(&mut self, conn: ConnId, entry: Uuid) {
        self.untrack(conn);
        self.by_conn.insert(conn, entry);
        self.by_entry.entry(entry).or_default().insert(conn);
    }

    /// Drop a connection's association, typically on disconnect.
    pub fn untrack(&mut self, conn: ConnId) {
        if let Some(entry) = self.by_conn.remove(&conn) {
            if let Some(conns) = self.by_entry.get_mut(&entry) {
                conns.remove(&conn);
                if conns.is_empty() {
                    self.by_entry.remove(&entry);
                }
            }
        }
    }

    /// All connections currently representing an entry.
    pub fn connections_for(&self, entry: Uuid) -> Vec<ConnId> {
        self.by_entry
            .get(&entry)
            .map(|conns| conns.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drop every association for a removed entry (after a kick or bulk
    /// clear).
    pub fn untrack_entry(&mut self, entry: Uuid) {
        if let Some(conns) = self.by_entry.remove(&entry) {
            for conn in conns {
                self.by_conn.remove(&conn);
            }
        }
    }

    /// The entry a connection currently represents, if any.
    pub fn entry_for(&self, conn: ConnId) -> Option<Uuid> {
        self.by_conn.get(&conn).copied()
    }
}
