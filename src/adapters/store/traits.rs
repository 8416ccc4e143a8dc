//! Durable artifact store abstraction

use crate::domain::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where a published artifact ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReference {
    /// Logical disk the artifact was stored on
    pub disk: String,

    /// Path of the artifact relative to the disk root, `/`-separated
    pub path: String,

    /// Size of the stored artifact in bytes
    pub size_bytes: u64,

    /// Hex-encoded SHA-256 of the stored artifact
    pub checksum: String,
}

/// Minimal write contract of the durable store
///
/// The store takes its own copy of the local file; the caller still owns and
/// removes the local file afterwards.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store the file at `local_path` under `(disk, directory)`, keeping its file name
    ///
    /// # Errors
    ///
    /// Returns a storage error if the artifact could not be stored and
    /// verified. Storage errors are retryable.
    async fn put(&self, local_path: &Path, disk: &str, directory: &str)
        -> Result<StoredReference>;
}
