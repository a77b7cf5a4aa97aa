//! Skirmish Network Library
//!
//! TCP networking for the initiative tracker.
//!
//! # Architecture
//!
//! - **Server**: holds the room store and identity tracker, accepts
//!   connections, broadcasts the full room snapshot after every mutation
//! - **Client**: a session handle for GM/player frontends and tests
//! - **Protocol**: length-prefixed JSON messages; kebab-case event tags
//!
//! The first frame on any connection is a [`Request`]. A `connect` request
//! upgrades the connection to a persistent session carrying
//! [`ClientEvent`]/[`ServerEvent`] frames; every other request gets a single
//! [`Response`] frame and the connection closes.

pub mod client;
pub mod error;
mod frame;
pub mod protocol;
pub mod server;

pub use client::{Client, Session};
pub use error::{Error, Result};
pub use protocol::{ClientEvent, Request, Response, ServerEvent};
pub use server::{Server, ServerConfig};

/// Default port for Skirmish servers
pub const DEFAULT_PORT: u16 = 3001;
