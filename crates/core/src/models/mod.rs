//! Data models for Skirmish

mod entry;
mod room;

pub use entry::*;
pub use room::*;
