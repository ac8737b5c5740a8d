//! Settings file loading and saving

use std::path::{Path, PathBuf};

use super::settings::SyncSettings;
use crate::error::{ConfigError, ConfigResult};

/// Settings file name inside the config directory
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Loads and saves [`SyncSettings`] as TOML
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a manager for the user config directory (`<config>/credsync`)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoConfigDir` if the platform has no config directory.
    pub fn new() -> ConfigResult<Self> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::with_config_dir(dir.join("credsync")))
    }

    /// Creates a manager for an explicit directory
    #[must_use]
    pub const fn with_config_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// The config directory
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of the settings file
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE_NAME)
    }

    /// Loads settings; a missing file yields defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_settings(&self) -> ConfigResult<SyncSettings> {
        let _span = tracing::debug_span!(crate::tracing::span_names::CONFIG_LOAD).entered();
        let path = self.settings_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Settings file not found, using defaults");
                return Ok(SyncSettings::default());
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        Ok(toml::from_str(&content)?)
    }

    /// Writes settings, creating the config directory if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be serialized or written.
    pub fn save_settings(&self, settings: &SyncSettings) -> ConfigResult<()> {
        let content = toml::to_string_pretty(settings)?;
        std::fs::create_dir_all(&self.config_dir).map_err(|source| ConfigError::Io {
            path: self.config_dir.clone(),
            source,
        })?;
        let path = self.settings_path();
        std::fs::write(&path, content).map_err(|source| ConfigError::Io { path, source })
    }
}
