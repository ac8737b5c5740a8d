//! `CredSync` Core Library
//!
//! This crate keeps an editable, ordered collection of account records
//! validated and durably snapshotted while a user edits it.
//!
//! # Crate Structure
//!
//! - [`models`] - Account records, ids, account types and tags
//! - [`tags`] - `;`-delimited tag text codec
//! - [`schema`] - Per-record validation rules, including the type-keyed password rule
//! - [`collection`] - Ordered collection with stable entry keys
//! - [`validation`] - Field, record and whole-collection validation
//! - [`coordinator`] - Save cycles gated on whole-collection validity
//! - [`persistence`] - Gateways that load and replace the stored collection
//! - [`notify`] - Save notifications
//! - [`config`] - Settings and their TOML persistence
//! - [`tracing`] - Logging setup and span names

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]

pub mod collection;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod notify;
pub mod persistence;
pub mod schema;
pub mod tags;
pub mod tracing;
pub mod validation;

pub use collection::{CollectionEntry, CollectionState, EntryKey, FieldUpdate};
pub use config::{
    ConfigManager, LoggingSettings, PersistenceSettings, StorageSettings, SyncSettings,
};
pub use coordinator::{CycleOutcome, SaveCoordinator, SaveReport, SaveState, SaveStatus};
pub use error::{
    CollectionError, ConfigError, ConfigResult, FieldError, PersistenceError, PersistenceResult,
    SaveError, SaveResult, ValidationErrors,
};
pub use models::{AccountRecord, AccountType, RecordId, Tag};
pub use notify::{ChannelNotifier, NoopNotifier, SaveEvent, SaveNotifier};
pub use persistence::{COLLECTION_FORMAT_VERSION, FileGateway, MemoryGateway, PersistenceGateway};
pub use schema::{
    FieldPath, MAX_LOGIN_LEN, MAX_PASSWORD_LEN, MAX_TAG_LEN, MAX_TAGS_LEN, PasswordRule,
    RecordField, RecordSchema,
};
pub use tracing::{
    TracingConfig, TracingError, TracingLevel, TracingOutput, TracingResult,
    get_tracing_config, init_tracing, is_tracing_initialized, span_names,
};
pub use validation::{ValidatedSnapshot, ValidationEngine};
