//! Core data models for CredSync
//!
//! This module contains the account record stored in a collection, its
//! identifier and type, and the tag label attached to it.

mod record;
mod tag;

pub use record::{AccountRecord, AccountType, RecordId};
pub use tag::Tag;
