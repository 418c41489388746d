//! Process configuration.
//!
//! Layered lowest to highest: built-in defaults, an optional TOML file, then
//! environment variables of the form `MEFM__<SECTION>__<KEY>` (for instance
//! `MEFM__STORE__PATH=/var/lib/mefm.db`). `MEFM__STORE__KINDS` takes a
//! comma-separated list.
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::persist::PersistenceMode;
use crate::schema::ALL_KINDS;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub maps: MapsSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// A file path, or `:memory:`.
    pub path: String,
    /// The entity kinds registered with the store at startup.
    pub kinds: Vec<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: "mefm.db".into(),
            kinds: ALL_KINDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl StoreSettings {
    pub fn mode(&self) -> PersistenceMode {
        PersistenceMode::from_path(&self.path)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapsSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Used for practitioners without a country of their own.
    pub country: String,
    pub timeout_ms: u64,
}

impl Default for MapsSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://maps.googleapis.com/maps/api/distancematrix/json".into(),
            api_key: None,
            country: "Canada".into(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// An `EnvFilter` directive; `RUST_LOG` wins when set.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".into(),
        }
    }
}

impl Settings {
    /// Loads settings from `path` (extension optional, missing file allowed)
    /// and the environment.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("MEFM")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("store.kinds")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
