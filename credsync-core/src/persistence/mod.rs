//! Persistence gateways for account collections
//!
//! A [`PersistenceGateway`] stores the whole collection as one unit: it is
//! loaded once at startup and every successful save replaces it entirely.
//! There is no partial update.

mod file;
mod memory;

pub use file::{COLLECTION_FORMAT_VERSION, FileGateway};
pub use memory::MemoryGateway;

use async_trait::async_trait;

use crate::error::PersistenceResult;
use crate::models::AccountRecord;

/// Storage for a complete account collection
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Loads the stored collection
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or decoded.
    async fn load(&self) -> PersistenceResult<Vec<AccountRecord>>;

    /// Replaces the stored collection with `records`
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    async fn replace(&self, records: &[AccountRecord]) -> PersistenceResult<()>;

    /// Identifier used in logs
    fn gateway_id(&self) -> &'static str;
}
