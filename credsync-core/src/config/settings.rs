//! Settings model
//!
//! Every field has a default so a partial or missing settings file still
//! loads.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::tracing::TracingLevel;

/// File name of the stored collection inside the data directory
pub const COLLECTION_FILE_NAME: &str = "accounts.json";

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Save worker behaviour
    #[serde(default)]
    pub persistence: PersistenceSettings,
    /// Log output
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Where the collection file lives
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Save worker settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceSettings {
    /// Quiet period before a queued snapshot is written, in milliseconds.
    /// Zero writes immediately.
    #[serde(default)]
    pub debounce_ms: u64,
}

impl PersistenceSettings {
    /// Debounce interval as a duration
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level name (`error`, `warn`, `info`, `debug`, `trace`)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Custom `EnvFilter` directive, overrides `level`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            filter: None,
        }
    }
}

impl LoggingSettings {
    /// Parsed level, falling back to info for unknown names
    #[must_use]
    pub fn tracing_level(&self) -> TracingLevel {
        self.level.parse().unwrap_or_default()
    }
}

/// Storage location settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Explicit collection file; defaults to the user data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_path: Option<PathBuf>,
}

impl StorageSettings {
    /// Resolves the collection file path.
    ///
    /// Returns `None` when no path is configured and no data directory exists.
    #[must_use]
    pub fn collection_path(&self) -> Option<PathBuf> {
        self.collection_path.clone().or_else(|| {
            dirs::data_dir().map(|dir| dir.join("credsync").join(COLLECTION_FILE_NAME))
        })
    }
}
