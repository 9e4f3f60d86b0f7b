//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `remote_base_url` is empty or not http(s)
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_replay_attempts` is 0 or exceeds 10
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote_base_url.is_empty() {
            return Err(ConfigError::Invalid {
                field: "remote_base_url".into(),
                reason: "must not be empty".into(),
            });
        }
        if !self.remote_base_url.starts_with("http://") && !self.remote_base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                field: "remote_base_url".into(),
                reason: "must be an http(s) URL".into(),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.max_replay_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "max_replay_attempts".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.max_replay_attempts > 10 {
            return Err(ConfigError::Invalid {
                field: "max_replay_attempts".into(),
                reason: "must not exceed 10".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        Ok(())
    }
}
