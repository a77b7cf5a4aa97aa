//! File-backed GM directory
//!
//! Loads the authored GM list (a JSON array of profiles with capitalized
//! `Password` fields and optional `encounters`) once at startup. The core
//! only sees the [`GmDirectory`] trait, never the file format.

use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use skirmish_core::{GmDirectory, GmProfile, Result};

#[derive(Debug, Default)]
pub struct FileDirectory {
    profiles: HashMap<String, GmProfile>,
}

impl FileDirectory {
    /// Parse the GM list file. A missing file is an error; an empty list is
    /// not.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let profiles: Vec<GmProfile> = serde_json::from_str(&raw)?;

        info!(path = %path.display(), count = profiles.len(), "GM directory loaded");
        if profiles.is_empty() {
            warn!(path = %path.display(), "GM directory is empty; no one can log in");
        }

        Ok(Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
        })
    }
}

impl GmDirectory for FileDirectory {
    fn lookup(&self, name: &str) -> Option<GmProfile> {
        self.profiles.get(name).cloned()
    }
}
