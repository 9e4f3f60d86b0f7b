//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (DAYBOOK_*)
//! 2. TOML config file (if DAYBOOK_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (DAYBOOK_*)
/// 2. TOML config file (if DAYBOOK_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the remote object store.
    ///
    /// Set via DAYBOOK_REMOTE_BASE_URL environment variable.
    #[serde(default = "default_remote_base_url")]
    pub remote_base_url: String,

    /// Per-user key prefix for stored documents.
    ///
    /// Set via DAYBOOK_USER_PREFIX environment variable. May be empty for
    /// single-user deployments.
    #[serde(default)]
    pub user_prefix: String,

    /// Path to the SQLite sync-state database.
    ///
    /// Set via DAYBOOK_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via DAYBOOK_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via DAYBOOK_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Replay attempts before a queued write is dropped.
    ///
    /// Set via DAYBOOK_MAX_REPLAY_ATTEMPTS environment variable.
    #[serde(default = "default_max_replay_attempts")]
    pub max_replay_attempts: u32,
}

fn default_remote_base_url() -> String {
    "http://localhost:9000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./daybook-sync.sqlite")
}

fn default_user_agent() -> String {
    "daybook/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_replay_attempts() -> u32 {
    3
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            remote_base_url: default_remote_base_url(),
            user_prefix: String::new(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_replay_attempts: default_max_replay_attempts(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `DAYBOOK_`
    /// 2. TOML file from `DAYBOOK_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("DAYBOOK_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("DAYBOOK_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
