//! Configuration management for CredSync
//!
//! This module provides the `ConfigManager` for loading and saving
//! settings in TOML format.

mod manager;
pub mod settings;

pub use manager::ConfigManager;
pub use settings::{LoggingSettings, PersistenceSettings, StorageSettings, SyncSettings};
