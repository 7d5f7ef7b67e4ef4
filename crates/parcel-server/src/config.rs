//! Node configuration.
//!
//! Read from `parcel-node.toml` inside the app root, then overridden by
//! `PARCEL_*` environment variables. A missing file means defaults.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ServerError, ServerResult};

pub const CONFIG_FILE: &str = "parcel-node.toml";
pub const APP_DIR: &str = ".parcel-node";

/// Directory holding the node's config, keys and database.
///
/// `~/.parcel-node`, or `./.parcel-node` when `local` is set or no home
/// directory is known.
pub fn app_root(local: bool) -> PathBuf {
    if local {
        return PathBuf::from(".").join(APP_DIR);
    }
    dirs::home_dir()
        .map(|home| home.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".").join(APP_DIR))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub tracker_url: String,
    /// Where the tracker delivers announcements.
    pub notify_bind: SocketAddr,
    /// Local application registration.
    pub admin_bind: SocketAddr,
    /// Address advertised to the tracker on subscribe.
    pub public_address: Option<String>,
    pub announce_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Relative paths are resolved against the app root.
    pub data_dir: PathBuf,
    pub keys_file: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            tracker_url: "http://127.0.0.1:8084".into(),
            notify_bind: SocketAddr::from(([0, 0, 0, 0], 8083)),
            admin_bind: SocketAddr::from(([127, 0, 0, 1], 6421)),
            public_address: None,
            announce_delay_ms: 3000,
            request_timeout_secs: 30,
            data_dir: PathBuf::from("db"),
            keys_file: PathBuf::from("keys.txt"),
        }
    }
}

impl NodeConfig {
    /// Load the configuration for `root`.
    ///
    /// `explicit` names a config file that must exist; otherwise
    /// `<root>/parcel-node.toml` is used if present.
    pub fn load(root: &Path, explicit: Option<&Path>) -> ServerResult<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = root.join(CONFIG_FILE);
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    debug!(path = %path.display(), "no config file, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.resolve_paths(root);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Apply `PARCEL_*` overrides, reading variables through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ServerResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PARCEL_TRACKER_URL") {
            self.tracker_url = url;
        }
        if let Some(addr) = lookup("PARCEL_NOTIFY_BIND") {
            self.notify_bind = parse_var("PARCEL_NOTIFY_BIND", &addr)?;
        }
        if let Some(addr) = lookup("PARCEL_ADMIN_BIND") {
            self.admin_bind = parse_var("PARCEL_ADMIN_BIND", &addr)?;
        }
        if let Some(address) = lookup("PARCEL_PUBLIC_ADDRESS") {
            self.public_address = Some(address);
        }
        if let Some(ms) = lookup("PARCEL_ANNOUNCE_DELAY_MS") {
            self.announce_delay_ms = parse_var("PARCEL_ANNOUNCE_DELAY_MS", &ms)?;
        }
        Ok(())
    }

    fn resolve_paths(&mut self, root: &Path) {
        if self.data_dir.is_relative() {
            self.data_dir = root.join(&self.data_dir);
        }
        if self.keys_file.is_relative() {
            self.keys_file = root.join(&self.keys_file);
        }
    }

    pub fn announce_delay(&self) -> Duration {
        Duration::from_millis(self.announce_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The address announced to the tracker: `public_address`, else the
    /// notify listener.
    pub fn advertised_address(&self) -> String {
        self.public_address
            .clone()
            .unwrap_or_else(|| self.notify_bind.to_string())
    }
}

fn parse_var<T>(name: &str, value: &str) -> ServerResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ServerError::Config(format!("{name}={value:?}: {e}")))
}
