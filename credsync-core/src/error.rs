//! Error types for CredSync
//!
//! Validation failures ([`FieldError`], [`ValidationErrors`]) are data: they
//! are returned to the caller for display and never abort a save cycle with
//! a Rust error. The remaining enums cover structural, storage and
//! configuration faults.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::RecordId;
use crate::schema::{FieldPath, RecordField};

/// A single field that failed its rule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {message}")]
pub struct FieldError {
    /// Location of the failing field
    pub path: FieldPath,
    /// Human-readable message
    pub message: String,
}

impl FieldError {
    /// Creates a field error
    #[must_use]
    pub fn new(path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

/// All field errors of a validation pass, keyed by path
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{} invalid field(s) in collection", .errors.len())]
pub struct ValidationErrors {
    errors: BTreeMap<FieldPath, String>,
}

impl ValidationErrors {
    /// Creates an empty error map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error, replacing any earlier message at the same path
    pub fn insert(&mut self, error: FieldError) {
        self.errors.insert(error.path, error.message);
    }

    /// Removes the error at a path, if any
    pub fn clear_path(&mut self, path: FieldPath) {
        self.errors.remove(&path);
    }

    /// Message for a record field
    #[must_use]
    pub fn get(&self, index: usize, field: RecordField) -> Option<&str> {
        self.errors
            .get(&FieldPath::new(index, field))
            .map(String::as_str)
    }

    /// Errors belonging to one record
    pub fn for_record(&self, index: usize) -> impl Iterator<Item = (RecordField, &str)> {
        self.errors
            .iter()
            .filter(move |(path, _)| path.index == index)
            .map(|(path, message)| (path.field, message.as_str()))
    }

    /// Iterates over all errors in path order
    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &str)> {
        self.errors.iter().map(|(path, message)| (path, message.as_str()))
    }

    /// Number of failing fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if no field failed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl FromIterator<FieldError> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        let mut errors = Self::new();
        for error in iter {
            errors.insert(error);
        }
        errors
    }
}

/// Structural errors from collection operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// Position does not hold a record
    #[error("index {index} out of bounds for collection of {len} record(s)")]
    IndexOutOfBounds {
        /// Requested position
        index: usize,
        /// Current collection length
        len: usize,
    },

    /// Another live record already has this id
    #[error("record id {0} is already in the collection")]
    DuplicateId(RecordId),
}

/// Errors from a persistence gateway
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading or writing the backing file failed
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The stored document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stored document was written by an unknown format version
    #[error("Unsupported collection format version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the document
        found: u32,
        /// Version this build writes
        expected: u32,
    },

    /// The store is not reachable
    #[error("Persistence unavailable: {0}")]
    Unavailable(String),
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Errors from the save coordinator
#[derive(Debug, Error)]
pub enum SaveError {
    /// A UI event referenced an invalid position or id
    #[error(transparent)]
    Collection(#[from] CollectionError),

    /// Loading the initial collection failed
    #[error("Failed to load collection: {0}")]
    Persistence(#[from] PersistenceError),

    /// The persistence worker has exited
    #[error("Persistence worker stopped")]
    WorkerStopped,
}

/// Result type for save coordinator operations
pub type SaveResult<T> = Result<T, SaveError>;

/// Errors from loading or saving settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the settings file failed
    #[error("Failed to access settings at {}: {source}", path.display())]
    Io {
        /// Settings file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for [`SyncSettings`](crate::config::SyncSettings)
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// Settings could not be encoded as TOML
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// No configuration directory could be determined
    #[error("Could not determine configuration directory")]
    NoConfigDir,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
