//! Server configuration from the environment
//!
//! Mirrors the deployment knobs of the original setup: a bind address, a
//! port, and a JSON file of GM profiles next to the binary.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use skirmish_net::DEFAULT_PORT;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    pub gm_file: PathBuf,
}

impl Config {
    /// Read `SKIRMISH_BIND`, `SKIRMISH_PORT`, and `SKIRMISH_GM_FILE`,
    /// falling back to the defaults. Malformed values fall back rather
    /// than aborting startup.
    pub fn from_env() -> Self {
        let bind = std::env::var("SKIRMISH_BIND")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let port = std::env::var("SKIRMISH_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let gm_file = std::env::var("SKIRMISH_GM_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("gm_list.json"));

        Self {
            bind,
            port,
            gm_file,
        }
    }
}
