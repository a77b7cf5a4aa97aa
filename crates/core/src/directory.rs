//! GM directory - injected read-only provider of credentials and templates
//!
//! The core never depends on a specific credential file format; the server
//! crate supplies a file-backed implementation, tests use
//! [`StaticDirectory`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::encounter::EncounterTemplate;

/// A GM's authored profile: login credential plus encounter templates.
///
/// The password field is capitalized in the authored file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmProfile {
    pub name: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(default)]
    pub encounters: Vec<EncounterTemplate>,
}

impl GmProfile {
    /// Simple name+password match; nothing stronger by design.
    pub fn check_password(&self, candidate: &str) -> bool {
        self.password == candidate
    }

    pub fn encounter(&self, name: &str) -> Option<&EncounterTemplate> {
        self.encounters.iter().find(|e| e.name == name)
    }
}

/// Read-only lookup of GM profiles by name.
pub trait GmDirectory: Send + Sync {
    fn lookup(&self, name: &str) -> Option<GmProfile>;
}

/// In-memory directory for tests and embedded setups.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    profiles: HashMap<String, GmProfile>,
}

impl StaticDirectory {
    pub fn new(profiles: impl IntoIterator<Item = GmProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
        }
    }
}

impl GmDirectory for StaticDirectory {
    fn lookup(&self, name: &str) -> Option<GmProfile> {
        self.profiles.get(name).cloned()
    }
}
