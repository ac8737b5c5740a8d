//! JSON file gateway
//!
//! Stores the collection as `{ "version": 1, "records": [...] }`. Writes go
//! to a sibling temporary file that is then renamed over the target, so a
//! crash mid-write leaves the previous collection intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::PersistenceGateway;
use crate::error::{PersistenceError, PersistenceResult};
use crate::models::AccountRecord;

/// Format version written by this build
pub const COLLECTION_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CollectionDocument {
    version: u32,
    #[serde(default)]
    records: Vec<AccountRecord>,
}

/// Gateway backed by a JSON file
#[derive(Debug, Clone)]
pub struct FileGateway {
    path: PathBuf,
}

impl FileGateway {
    /// Creates a gateway for the file at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The collection file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> PersistenceError {
        tracing::error!(gateway = self.gateway_id(), path = %path.display(), %source, "Collection file I/O failed");
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait]
impl PersistenceGateway for FileGateway {
    async fn load(&self) -> PersistenceResult<Vec<AccountRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No collection file yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(&self.path, e)),
        };

        let document: CollectionDocument = serde_json::from_str(&content)?;
        if document.version != COLLECTION_FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: document.version,
                expected: COLLECTION_FORMAT_VERSION,
            });
        }
        Ok(document.records)
    }

    async fn replace(&self, records: &[AccountRecord]) -> PersistenceResult<()> {
        let document = CollectionDocument {
            version: COLLECTION_FORMAT_VERSION,
            records: records.to_vec(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(parent, e))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| self.io_error(&temp, e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.io_error(&self.path, e))?;

        Ok(())
    }

    fn gateway_id(&self) -> &'static str {
        "file"
    }
}
