use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::DocrefError;

/// Importer settings, read from a TOML file.
///
/// ```toml
/// [import]
/// import_internal = false
/// skip_throttle = false
///
/// [throttle]
/// batch_size = 10
/// pause_ms = 3000
///
/// [store]
/// database = "docref.db"
/// ```
///
/// Every section and key is optional. The configuration is constructed once by the caller and
/// handed to the [`Importer`](crate::import::Importer); nothing reads it from global state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    pub import: ImportSection,
    pub throttle: ThrottleSection,
    pub store: StoreSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSection {
    pub import_internal: bool,
    pub skip_throttle: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleSection {
    /// Entities per collection between pauses. Zero disables throttling.
    pub batch_size: usize,
    pub pause_ms: u64,
}

impl Default for ThrottleSection {
    fn default() -> Self {
        ThrottleSection {
            batch_size: 10,
            pause_ms: 3000,
        }
    }
}

impl ThrottleSection {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// SQLite database file used by the `docref` binary.
    pub database: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        StoreSection {
            database: PathBuf::from("docref.db"),
        }
    }
}

impl ImporterConfig {
    /// Read the configuration at `path`. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ImporterConfig, DocrefError> {
        let path = path.as_ref();
        tracing::debug!("Attempting to read importer config from: {:?}", path);
        if !path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(ImporterConfig::default());
        }
        let content = read_to_string(path)?;
        ImporterConfig::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<ImporterConfig, DocrefError> {
        Ok(toml::from_str(content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DocrefError> {
        tracing::debug!("Attempting to write importer config to: {:?}", path.as_ref());
        write(path, toml::to_string(self)?)?;
        Ok(())
    }
}
