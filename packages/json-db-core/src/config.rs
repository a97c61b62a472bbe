//! Database configuration.
//!
//! Supports TOML config files, environment variable overrides, and defaults.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DbError;

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Root directory holding `schema.json` and the `data/` table files
    pub data_dir: PathBuf,
    /// Pending changes that force a flush after a mutation
    pub change_threshold: u64,
    /// Longest a dirty table waits after its last flush, in milliseconds
    pub time_threshold_ms: u64,
    /// Maximum retry attempts for transient I/O errors
    pub persistence_max_retries: u32,
    /// Delay between retry attempts in milliseconds
    pub persistence_retry_delay_ms: u64,
    /// Fraction of freed row slots that triggers arena compaction
    pub compact_ratio: f64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            change_threshold: 100,
            time_threshold_ms: 5000,
            persistence_max_retries: 3,
            persistence_retry_delay_ms: 100,
            compact_ratio: 0.5,
        }
    }
}

impl DbConfig {
    /// Creates a configuration rooted at `data_dir` with default thresholds.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DbError::ConfigError(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string. Missing keys keep their defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, DbError> {
        toml::from_str(toml_str).map_err(|e| DbError::ConfigError(format!("Invalid TOML: {}", e)))
    }

    /// Applies environment variable overrides.
    ///
    /// Variables are prefixed with `JSONDB_`, e.g. `JSONDB_DATA_DIR=/path`.
    pub fn apply_env_overrides(&mut self) -> Result<(), DbError> {
        if let Ok(val) = env::var("JSONDB_DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = env::var("JSONDB_CHANGE_THRESHOLD") {
            self.change_threshold = val
                .parse()
                .map_err(|_| DbError::ConfigError(format!("Invalid change_threshold: {}", val)))?;
        }
        if let Ok(val) = env::var("JSONDB_TIME_THRESHOLD_MS") {
            self.time_threshold_ms = val
                .parse()
                .map_err(|_| DbError::ConfigError(format!("Invalid time_threshold_ms: {}", val)))?;
        }
        if let Ok(val) = env::var("JSONDB_MAX_RETRIES") {
            self.persistence_max_retries = val.parse().map_err(|_| {
                DbError::ConfigError(format!("Invalid persistence_max_retries: {}", val))
            })?;
        }
        if let Ok(val) = env::var("JSONDB_RETRY_DELAY_MS") {
            self.persistence_retry_delay_ms = val.parse().map_err(|_| {
                DbError::ConfigError(format!("Invalid persistence_retry_delay_ms: {}", val))
            })?;
        }
        Ok(())
    }

    /// Time threshold as a `Duration`.
    pub fn time_threshold(&self) -> Duration {
        Duration::from_millis(self.time_threshold_ms)
    }

    /// Directory holding one JSON file per table.
    pub fn table_dir(&self) -> PathBuf {
        self.data_dir.join("data")
    }

    /// Path of the schema document.
    pub fn schema_path(&self) -> PathBuf {
        self.data_dir.join("schema.json")
    }
}
