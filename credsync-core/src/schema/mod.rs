//! Declarative validation rules for a single account record
//!
//! The schema is a set of per-field rules. The password rule is conditional:
//! [`PasswordRule::for_type`] selects it from the record's current
//! [`AccountType`] every time a record is checked, so changing the type
//! changes the rule on the very next validation pass.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{AccountRecord, AccountType, Tag};
use crate::tags;

/// Maximum login length in characters
pub const MAX_LOGIN_LEN: usize = 100;

/// Maximum password length in characters
pub const MAX_PASSWORD_LEN: usize = 100;

/// Maximum length of a single tag in characters
pub const MAX_TAG_LEN: usize = 50;

/// Maximum length of all tags joined with `;`
pub const MAX_TAGS_LEN: usize = 50;

/// Letters and `;` only
static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z;]+$").expect("TAG_PATTERN is a valid regex pattern"));

/// Editable fields of an account record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordField {
    /// Login name
    Login,
    /// Password
    Password,
    /// Account type
    Type,
    /// Tags
    Tags,
}

impl RecordField {
    /// Field name as it appears in error paths
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Password => "password",
            Self::Type => "type",
            Self::Tags => "tags",
        }
    }

    /// All fields in declaration order
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Login, Self::Password, Self::Type, Self::Tags]
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Location of a field within the collection: `(record index, field)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldPath {
    /// Position of the record in the collection
    pub index: usize,
    /// Field within the record
    pub field: RecordField,
}

impl FieldPath {
    /// Creates a path for the given record position and field
    #[must_use]
    pub const fn new(index: usize, field: RecordField) -> Self {
        Self { index, field }
    }
}

impl Ord for FieldPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index
            .cmp(&other.index)
            .then_with(|| self.field.cmp(&other.field))
    }
}

impl PartialOrd for FieldPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "records[{}].{}", self.index, self.field)
    }
}

/// Password rule, selected by account type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    /// Non-null, non-empty and at most `max_len` characters
    Required {
        /// Maximum length in characters
        max_len: usize,
    },
    /// Any value is accepted; normalization forces it to null
    ForcedNull,
}

impl PasswordRule {
    /// Selects the password rule for an account type
    #[must_use]
    pub const fn for_type(kind: AccountType) -> Self {
        match kind {
            AccountType::Local => Self::Required {
                max_len: MAX_PASSWORD_LEN,
            },
            AccountType::Directory => Self::ForcedNull,
        }
    }

    /// Checks a password value against this rule
    ///
    /// # Errors
    ///
    /// Returns the failure message.
    pub fn check(self, password: Option<&str>) -> Result<(), String> {
        match self {
            Self::ForcedNull => Ok(()),
            Self::Required { max_len } => match password {
                None | Some("") => Err("password is required for local accounts".to_string()),
                Some(value) if value.chars().count() > max_len => {
                    Err(format!("password must be at most {max_len} characters"))
                }
                Some(_) => Ok(()),
            },
        }
    }
}

/// Validation rules for one account record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    /// Maximum login length
    pub max_login_len: usize,
    /// Maximum length of one tag
    pub max_tag_len: usize,
    /// Maximum joined length of all tags
    pub max_tags_len: usize,
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            max_login_len: MAX_LOGIN_LEN,
            max_tag_len: MAX_TAG_LEN,
            max_tags_len: MAX_TAGS_LEN,
        }
    }
}

impl RecordSchema {
    /// Creates the default schema
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks a single field of a record
    ///
    /// # Errors
    ///
    /// Returns the message of the first rule the field fails.
    pub fn check_field(&self, record: &AccountRecord, field: RecordField) -> Result<(), String> {
        match field {
            RecordField::Login => self.check_login(&record.login),
            RecordField::Password => {
                PasswordRule::for_type(record.kind).check(record.password.as_deref())
            }
            // The type is an enum; any value is valid
            RecordField::Type => Ok(()),
            RecordField::Tags => self.check_tags(&record.tags),
        }
    }

    fn check_login(&self, login: &str) -> Result<(), String> {
        if login.is_empty() {
            return Err("login is required".to_string());
        }
        if login.chars().count() > self.max_login_len {
            return Err(format!(
                "login must be at most {} characters",
                self.max_login_len
            ));
        }
        Ok(())
    }

    fn check_tags(&self, tags: &[Tag]) -> Result<(), String> {
        for tag in tags {
            if !TAG_PATTERN.is_match(&tag.text) {
                return Err(format!(
                    "tag \"{}\" may contain only letters and ';'",
                    tag.text
                ));
            }
            if tag.len() > self.max_tag_len {
                return Err(format!(
                    "tag \"{}\" must be at most {} characters",
                    tag.text, self.max_tag_len
                ));
            }
        }
        if tags::serialized_len(tags) > self.max_tags_len {
            return Err(format!(
                "tags must be at most {} characters when joined",
                self.max_tags_len
            ));
        }
        Ok(())
    }
}
