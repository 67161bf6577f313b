//! Registry configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file is a valid
//! configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use dataroom_store::SqliteStore;

use crate::error::{Error, Result};

/// Complete registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Re-issue read rights on a rescored quality handle to the contributor
    /// and every grantee. When false, only the registry may use the new handle.
    #[serde(default = "default_true")]
    pub propagate_grants_on_rescore: bool,

    /// Capacity of the event broadcast channel. Slow subscribers that fall
    /// further behind than this miss events (they can catch up from the log).
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file. `None` = in-memory database.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_event_buffer() -> usize {
    1024
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            propagate_grants_on_rescore: true,
            event_buffer: default_event_buffer(),
            storage: StorageConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RegistryConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer == 0 {
            return Err(Error::Config("event_buffer must be at least 1".into()));
        }
        Ok(())
    }
}

impl StorageConfig {
    /// Open the configured SQLite database.
    pub fn open(&self) -> Result<SqliteStore> {
        let store = match &self.path {
            Some(path) => SqliteStore::open(path)?,
            None => SqliteStore::open_memory()?,
        };
        Ok(store)
    }
}
