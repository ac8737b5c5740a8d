//! Tag text codec
//!
//! Converts between the `;`-delimited text a user types and the ordered
//! list of [`Tag`]s stored on a record. Decoding trims whitespace and drops
//! blank segments, so `decode` is not an exact inverse of `encode`.

use crate::models::Tag;

/// Separator between tags in the text representation
pub const TAG_SEPARATOR: char = ';';

/// Joins tag texts with `;`
#[must_use]
pub fn encode(tags: &[Tag]) -> String {
    tags.iter()
        .map(|tag| tag.text.as_str())
        .collect::<Vec<_>>()
        .join(";")
}

/// Splits text on `;` into trimmed, non-empty tags, preserving order
#[must_use]
pub fn decode(text: &str) -> Vec<Tag> {
    text.split(TAG_SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(Tag::new)
        .collect()
}

/// Length of the encoded form: the sum of tag lengths plus one separator
/// between each pair of tags
#[must_use]
pub fn serialized_len(tags: &[Tag]) -> usize {
    let text_len: usize = tags.iter().map(Tag::len).sum();
    text_len + tags.len().saturating_sub(1)
}
