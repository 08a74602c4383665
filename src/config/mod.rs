//! Hub configuration: loaded from TOML, split into tables the way the
//! teacher (`slircd-ng`) splits `server`/`security`/`limits`/`listen`.

mod defaults;
pub mod limits;
mod types;
mod validation;

pub use limits::Limits;
pub use types::*;
pub use validation::validate;

use crate::error::{HubError, HubResult};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub nick: NickConfig,
    #[serde(default)]
    pub tag: TagConfig,
    #[serde(default)]
    pub flood: FloodConfig,
    #[serde(default)]
    pub zlib: ZlibConfig,
    #[serde(default)]
    pub db: DbConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            limits: Limits::default(),
            timeouts: TimeoutConfig::default(),
            nick: NickConfig::default(),
            tag: TagConfig::default(),
            flood: FloodConfig::default(),
            zlib: ZlibConfig::default(),
            db: DbConfig::default(),
        }
    }
}

impl Config {
    /// `VERLIHUB_CFG` overrides the directory a bare filename is resolved
    /// against, matching spec.md §6.
    pub fn load(path: &str) -> HubResult<Self> {
        let resolved = if Path::new(path).is_absolute() {
            path.to_string()
        } else if let Ok(dir) = std::env::var("VERLIHUB_CFG") {
            format!("{dir}/{path}")
        } else {
            path.to_string()
        };

        let text = std::fs::read_to_string(&resolved)
            .map_err(|e| HubError::Config(format!("cannot read {resolved}: {e}")))?;
        toml::from_str(&text).map_err(|e| HubError::Config(format!("cannot parse {resolved}: {e}")))
    }
}
