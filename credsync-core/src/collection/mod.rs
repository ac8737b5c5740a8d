//! Ordered collection of account records
//!
//! Records live in an arena keyed by [`EntryKey`]; a separate ordered list
//! maps positions to keys. Removing a record shifts the positions of later
//! records but never changes their keys or ids.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::CollectionError;
use crate::models::{AccountRecord, AccountType, RecordId, Tag};
use crate::schema::RecordField;
use crate::tags;

/// UI identity of a collection entry.
///
/// Keys are handed out from a per-collection counter and never reused, so a
/// key cannot alias a different record after an earlier entry is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey(u64);

impl EntryKey {
    /// Returns the raw key value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry-{}", self.0)
    }
}

/// A record together with its UI identity key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionEntry {
    /// UI identity key
    pub key: EntryKey,
    /// The record
    pub record: AccountRecord,
}

/// Replacement value for a single record field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    /// New login
    Login(String),
    /// New password; ignored for directory accounts
    Password(Option<String>),
    /// New account type; switching to directory drops the password
    Type(AccountType),
    /// New tag list
    Tags(Vec<Tag>),
    /// Tags as `;`-delimited text
    TagsText(String),
}

impl FieldUpdate {
    /// The field this update replaces
    #[must_use]
    pub const fn field(&self) -> RecordField {
        match self {
            Self::Login(_) => RecordField::Login,
            Self::Password(_) => RecordField::Password,
            Self::Type(_) => RecordField::Type,
            Self::Tags(_) | Self::TagsText(_) => RecordField::Tags,
        }
    }
}

/// Ordered collection of account records with stable entry keys
#[derive(Debug, Clone, Default)]
pub struct CollectionState {
    /// Records indexed by entry key
    entries: HashMap<EntryKey, AccountRecord>,
    /// Position-to-key mapping
    order: Vec<EntryKey>,
    /// Next key to hand out
    next_key: u64,
}

impl CollectionState {
    /// Creates an empty collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from stored records.
    ///
    /// Missing ids are filled, duplicate ids are replaced with fresh ones and
    /// directory accounts lose any stored password.
    #[must_use]
    pub fn from_records(records: Vec<AccountRecord>) -> Self {
        let mut state = Self::new();
        let mut seen = HashSet::with_capacity(records.len());

        for mut record in records {
            if record.id.is_missing() {
                record.id = RecordId::new();
            } else if !seen.insert(record.id) {
                let fresh = RecordId::new();
                tracing::warn!(
                    duplicate_id = %record.id,
                    new_id = %fresh,
                    "Stored collection contains a duplicate record id, assigning a new one"
                );
                record.id = fresh;
            }
            seen.insert(record.id);
            record.set_kind(record.kind);
            state.insert_unchecked(record);
        }

        state
    }

    fn allocate_key(&mut self) -> EntryKey {
        let key = EntryKey(self.next_key);
        self.next_key += 1;
        key
    }

    fn insert_unchecked(&mut self, record: AccountRecord) -> EntryKey {
        let key = self.allocate_key();
        self.entries.insert(key, record);
        self.order.push(key);
        key
    }

    /// Appends a record with a fresh entry key
    ///
    /// A missing id is filled before insertion and a directory record loses
    /// any password.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::DuplicateId` if a live record has the same id.
    pub fn push(&mut self, mut record: AccountRecord) -> Result<EntryKey, CollectionError> {
        if record.id.is_missing() {
            record.id = RecordId::new();
        } else if self.entries.values().any(|r| r.id == record.id) {
            return Err(CollectionError::DuplicateId(record.id));
        }
        record.set_kind(record.kind);
        Ok(self.insert_unchecked(record))
    }

    /// Appends an empty local record
    pub fn add_record(&mut self) -> EntryKey {
        self.insert_unchecked(AccountRecord::new())
    }

    /// Removes the record at `index`; later records move up by one position
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::IndexOutOfBounds` if `index` is not a live position.
    pub fn remove(&mut self, index: usize) -> Result<CollectionEntry, CollectionError> {
        let key = self.key_at(index)?;
        self.order.remove(index);
        let record = self
            .entries
            .remove(&key)
            .ok_or(CollectionError::IndexOutOfBounds {
                index,
                len: self.order.len(),
            })?;
        Ok(CollectionEntry { key, record })
    }

    /// Replaces one field of the record at `index` in place.
    ///
    /// Does not validate or persist.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::IndexOutOfBounds` if `index` is not a live position.
    pub fn update_field(&mut self, index: usize, update: FieldUpdate) -> Result<(), CollectionError> {
        let record = self.get_mut(index)?;
        match update {
            FieldUpdate::Login(login) => record.login = login,
            FieldUpdate::Password(password) => {
                if record.kind.stores_password() {
                    record.password = password;
                }
            }
            FieldUpdate::Type(kind) => record.set_kind(kind),
            FieldUpdate::Tags(tags) => record.tags = tags,
            FieldUpdate::TagsText(text) => record.tags = tags::decode(&text),
        }
        Ok(())
    }

    /// Entry key at a position
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::IndexOutOfBounds` if `index` is not a live position.
    pub fn key_at(&self, index: usize) -> Result<EntryKey, CollectionError> {
        self.order
            .get(index)
            .copied()
            .ok_or(CollectionError::IndexOutOfBounds {
                index,
                len: self.order.len(),
            })
    }

    /// Current position of an entry key
    #[must_use]
    pub fn position_of(&self, key: EntryKey) -> Option<usize> {
        self.order.iter().position(|k| *k == key)
    }

    /// Record at a position
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&AccountRecord> {
        self.order.get(index).and_then(|key| self.entries.get(key))
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut AccountRecord, CollectionError> {
        let key = self.key_at(index)?;
        let len = self.order.len();
        self.entries
            .get_mut(&key)
            .ok_or(CollectionError::IndexOutOfBounds { index, len })
    }

    /// Record by entry key
    #[must_use]
    pub fn get_by_key(&self, key: EntryKey) -> Option<&AccountRecord> {
        self.entries.get(&key)
    }

    /// Number of live records
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the collection holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in order
    pub fn iter(&self) -> impl Iterator<Item = CollectionEntry> + '_ {
        self.order.iter().filter_map(|key| {
            self.entries.get(key).map(|record| CollectionEntry {
                key: *key,
                record: record.clone(),
            })
        })
    }

    /// Records in order
    pub fn records(&self) -> impl Iterator<Item = &AccountRecord> + '_ {
        self.order.iter().filter_map(|key| self.entries.get(key))
    }
}
