//! Tag label attached to an account record.

use serde::{Deserialize, Serialize};

/// A short text label attached to an account record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Label text
    pub text: String,
}

impl Tag {
    /// Creates a tag with the given text
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Length of the tag text in characters
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns true if the tag text is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl From<&str> for Tag {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
