//! Configuration loading and management
//!
//! Handles parsing of `.taskdeck.toml` configuration files.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::history::RecencyTracker;

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE: &str = ".taskdeck.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// View history configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// Snapshot storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// View history configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Keep at most this many distinct ids; unbounded when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
}

impl HistoryConfig {
    /// Build the tracker this configuration describes
    pub fn tracker(&self) -> Result<RecencyTracker> {
        match self.capacity {
            None => Ok(RecencyTracker::new()),
            Some(capacity) => NonZeroUsize::new(capacity)
                .map(RecencyTracker::bounded)
                .ok_or_else(|| {
                    Error::InvalidConfig("history.capacity must be > 0".to_string())
                }),
        }
    }
}

/// Snapshot storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Snapshot file, relative to the working directory
    #[serde(default = "default_file")]
    pub file: PathBuf,
}

fn default_file() -> PathBuf {
    PathBuf::from("tasks.csv")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file: default_file(),
        }
    }
}

impl Config {
    /// Load configuration from a `.taskdeck.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.taskdeck.toml` from a directory, or return defaults when absent
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.history.tracker()?;
        if self.storage.file.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "storage.file cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
