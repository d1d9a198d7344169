//! Runtime configuration for hosts embedding the registry core.
//!
//! # Responsibility
//! - Resolve database path and logging options from the environment.
//! - Validate values up front so bootstrap failures name the bad setting.
//!
//! # Invariants
//! - Loading never touches the filesystem.
//! - Logging stays disabled unless a log directory is configured.

use crate::logging::{default_log_level, normalize_level};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "PERSON_REGISTRY_DB";
pub const ENV_LOG_LEVEL: &str = "PERSON_REGISTRY_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "PERSON_REGISTRY_LOG_DIR";
pub const DEFAULT_DB_FILE_NAME: &str = "person_registry.sqlite3";

/// Resolved registry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: &'static str,
    /// Absolute directory for rolling logs; `None` disables file logging.
    pub log_dir: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl RegistryConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`; blank values count as unset.
    ///
    /// # Errors
    /// - Returns an error when the configured log level is unsupported.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level =
                normalize_level(&level).map_err(|err| format!("{ENV_LOG_LEVEL}: {err}"))?;
        }
        config.log_dir = read(ENV_LOG_DIR);
        Ok(config)
    }
}
