//! Account record model
//!
//! An [`AccountRecord`] is one login credential entry. Local accounts carry
//! a password; directory accounts authenticate externally and never store one.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Tag;

/// Stable identifier of an account record.
///
/// Assigned once at creation and never reassigned. The nil UUID marks a
/// record that was stored without an identifier; such ids are filled on load
/// and during snapshot normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Creates a new random record ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The placeholder for a missing identifier.
    #[must_use]
    pub const fn missing() -> Self {
        Self(Uuid::nil())
    }

    /// Returns true if this id is the missing-id placeholder.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.0.is_nil()
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an account authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Password-authenticated account; a password is required
    #[default]
    Local,
    /// Externally authenticated (LDAP-style) account; password is always null
    Directory,
}

impl AccountType {
    /// Returns true if accounts of this type store a password
    #[must_use]
    pub const fn stores_password(self) -> bool {
        matches!(self, Self::Local)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// One login credential entry
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Stable identifier, unique within the collection
    #[serde(default)]
    pub id: RecordId,
    /// Login name
    #[serde(default)]
    pub login: String,
    /// Password; always `None` for directory accounts
    #[serde(default)]
    pub password: Option<String>,
    /// Account type
    #[serde(rename = "type", default)]
    pub kind: AccountType,
    /// Ordered tags
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl AccountRecord {
    /// Creates an empty local record with a fresh id
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: RecordId::new(),
            login: String::new(),
            password: None,
            kind: AccountType::Local,
            tags: Vec::new(),
        }
    }

    /// Creates a local record with the given login and password
    #[must_use]
    pub fn local(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: Some(password.into()),
            ..Self::new()
        }
    }

    /// Creates a directory record with the given login
    #[must_use]
    pub fn directory(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            kind: AccountType::Directory,
            ..Self::new()
        }
    }

    /// Sets the tags
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    /// Changes the account type.
    ///
    /// Switching to [`AccountType::Directory`] drops the password.
    pub fn set_kind(&mut self, kind: AccountType) {
        self.kind = kind;
        if !kind.stores_password() {
            self.password = None;
        }
    }

    /// Returns a copy with a filled id and the password nulled for
    /// directory accounts
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut record = self.clone();
        if record.id.is_missing() {
            record.id = RecordId::new();
        }
        if !record.kind.stores_password() {
            record.password = None;
        }
        record
    }
}

impl Default for AccountRecord {
    fn default() -> Self {
        Self::new()
    }
}

// Password text stays out of logs and panic messages
impl fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRecord")
            .field("id", &self.id)
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("kind", &self.kind)
            .field("tags", &self.tags)
            .finish()
    }
}
