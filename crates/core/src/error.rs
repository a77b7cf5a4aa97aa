//! Error types for Skirmish Core

use thiserror::Error;

/// Loading external data (GM and encounter files) is the only fallible
/// core surface; room mutations report [`Outcome`](crate::store::Outcome)
/// instead of erroring.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
