//! In-process gateway

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::PersistenceGateway;
use crate::error::PersistenceResult;
use crate::models::AccountRecord;

/// Gateway that keeps the collection in memory.
///
/// Clones share the same store, so a caller can keep a handle to inspect
/// what the coordinator wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    records: Arc<RwLock<Vec<AccountRecord>>>,
    replace_count: Arc<AtomicUsize>,
}

impl MemoryGateway {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `records`
    #[must_use]
    pub fn with_records(records: Vec<AccountRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
            replace_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Current stored collection
    pub async fn stored(&self) -> Vec<AccountRecord> {
        self.records.read().await.clone()
    }

    /// Number of completed `replace` calls
    #[must_use]
    pub fn replace_count(&self) -> usize {
        self.replace_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn load(&self) -> PersistenceResult<Vec<AccountRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn replace(&self, records: &[AccountRecord]) -> PersistenceResult<()> {
        let mut stored = self.records.write().await;
        *stored = records.to_vec();
        self.replace_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn gateway_id(&self) -> &'static str {
        "memory"
    }
}
