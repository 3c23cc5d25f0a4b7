//! Application settings, read from `settings.toml`.
//!
//! The file path can be overridden with `EXPENSPLIT_SETTINGS`, and every key
//! with an `EXPENSPLIT__` environment variable (`EXPENSPLIT__TELEGRAM__TOKEN`).
//! See `settings.toml` for an example.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_SETTINGS_PATH: &str = "settings";

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("expensplit.db".to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct Telegram {
    pub token: String,
    /// Username seeded as owner of every new group.
    pub owner: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Rates {
    #[serde(default = "default_rates_url")]
    pub url: String,
    #[serde(default = "default_reference")]
    pub reference: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for Rates {
    fn default() -> Self {
        Self {
            url: default_rates_url(),
            reference: default_reference(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub database: Database,
    pub telegram: Option<Telegram>,
    #[serde(default)]
    pub rates: Rates,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let path = std::env::var("EXPENSPLIT_SETTINGS")
            .unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());

        let settings = Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(Environment::with_prefix("EXPENSPLIT").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_rates_url() -> String {
    "https://open.er-api.com/v6/latest".to_string()
}

fn default_reference() -> String {
    "SGD".to_string()
}

fn default_timeout() -> u64 {
    10
}
