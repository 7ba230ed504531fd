/// Configuration for the engine binary
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Overrides `snapshot_path` when set
pub const SNAPSHOT_ENV: &str = "ENROLLMENT_SNAPSHOT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("intent queue capacity must be positive")]
    EmptyQueue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Snapshot the engine loads at startup
    pub snapshot_path: PathBuf,
    /// Bound of the queue between the engine and the persistence worker
    pub intent_queue_capacity: usize,
    /// One of `trace`, `debug`, `info`, `warn` or `error`
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("snapshot.json"),
            intent_queue_capacity: 1024,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Loads a JSON config file. Missing fields take their default values.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Replaces the snapshot path with `value` if one is given.
    pub fn with_snapshot_override(mut self, value: Option<String>) -> Self {
        if let Some(path) = value.filter(|path| !path.is_empty()) {
            self.snapshot_path = PathBuf::from(path);
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.intent_queue_capacity == 0 {
            return Err(ConfigError::EmptyQueue);
        }
        Ok(())
    }
}
