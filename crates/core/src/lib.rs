//! Skirmish Core Library
//!
//! In-memory room state, connection identity tracking, encounter templates,
//! and the GM directory interface for the Skirmish initiative tracker.
//! Everything here is pure and synchronous; networking lives in
//! `skirmish-net`.

pub mod directory;
pub mod encounter;
pub mod error;
pub mod invariants;
pub mod models;
pub mod store;
pub mod tracker;

pub use directory::{GmDirectory, GmProfile, StaticDirectory};
pub use encounter::{load_encounter, ClearPolicy, EncounterTemplate, LoadOutcome, MonsterTemplate};
pub use error::{Error, Result};
pub use models::{Entry, NewMonster, NewPlayer, Room};
pub use store::{Outcome, RoomStore};
pub use tracker::{ConnId, IdentityTracker};
