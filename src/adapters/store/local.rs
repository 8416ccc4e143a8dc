//! Local filesystem artifact store
//!
//! Artifacts land in `<root>/<disk>/<directory>/<file name>`. The copy is
//! written next to its destination under a temporary name and renamed once
//! its checksum matches the source file.

use crate::adapters::store::traits::{ArtifactStore, StoredReference};
use crate::core::verification::checksum::verify_copy;
use crate::domain::{QuireError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Artifact store rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalDiskStore {
    root: PathBuf,
}

impl LocalDiskStore {
    /// Creates a store rooted at `root`; the directory is created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored reference back to an absolute local path
    pub fn resolve(&self, reference: &StoredReference) -> PathBuf {
        self.root.join(&reference.disk).join(&reference.path)
    }
}

/// Reject anything but plain relative path segments
fn safe_relative(label: &str, value: &str, allow_empty: bool) -> Result<PathBuf> {
    if value.is_empty() {
        return if allow_empty {
            Ok(PathBuf::new())
        } else {
            Err(QuireError::Validation(format!("{label} must not be empty")))
        };
    }

    let path = Path::new(value);
    if path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(QuireError::Validation(format!(
            "{label} '{value}' must be a relative path without '..' segments"
        )));
    }
    Ok(path.to_path_buf())
}

#[async_trait]
impl ArtifactStore for LocalDiskStore {
    async fn put(
        &self,
        local_path: &Path,
        disk: &str,
        directory: &str,
    ) -> Result<StoredReference> {
        let disk_dir = safe_relative("Disk", disk, false)?;
        let sub_dir = safe_relative("Directory", directory, true)?;
        let file_name = local_path.file_name().ok_or_else(|| {
            QuireError::Storage(format!("{} has no file name", local_path.display()))
        })?;

        let target_dir = self.root.join(&disk_dir).join(&sub_dir);
        tokio::fs::create_dir_all(&target_dir).await.map_err(|e| {
            QuireError::Storage(format!("Failed to create {}: {e}", target_dir.display()))
        })?;

        let target = target_dir.join(file_name);
        let staging = target_dir.join(format!(".{}.upload", file_name.to_string_lossy()));

        let size_bytes = tokio::fs::copy(local_path, &staging).await.map_err(|e| {
            QuireError::Storage(format!(
                "Failed to copy {} to {}: {e}",
                local_path.display(),
                staging.display()
            ))
        })?;

        let source = local_path.to_path_buf();
        let copy = staging.clone();
        let verified = tokio::task::spawn_blocking(move || verify_copy(&source, &copy))
            .await
            .map_err(|e| QuireError::Storage(format!("Checksum task failed: {e}")))?;

        let checksum = match verified {
            Ok(checksum) => checksum,
            Err(e) => {
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(QuireError::Storage(e.to_string()));
            }
        };

        tokio::fs::rename(&staging, &target).await.map_err(|e| {
            QuireError::Storage(format!("Failed to finalize {}: {e}", target.display()))
        })?;

        let relative = sub_dir.join(file_name);
        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        tracing::debug!(
            disk = %disk,
            path = %path,
            size_bytes,
            "Artifact stored"
        );

        Ok(StoredReference {
            disk: disk.to_string(),
            path,
            size_bytes,
            checksum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::verification::checksum::calculate_checksum_bytes;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_copies_into_disk_directory() {
        let scratch = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let local = scratch.path().join("report-20250101120000.csv");
        std::fs::write(&local, b"id\n1\n").unwrap();

        let store = LocalDiskStore::new(root.path());
        let stored = store.put(&local, "local", "exports/daily").await.unwrap();

        assert_eq!(stored.disk, "local");
        assert_eq!(stored.path, "exports/daily/report-20250101120000.csv");
        assert_eq!(stored.size_bytes, 5);
        assert_eq!(stored.checksum, calculate_checksum_bytes(b"id\n1\n"));
        assert_eq!(std::fs::read(store.resolve(&stored)).unwrap(), b"id\n1\n");
        // caller keeps ownership of the local file
        assert!(local.exists());
    }

    #[tokio::test]
    async fn test_put_with_empty_directory() {
        let scratch = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let local = scratch.path().join("a.csv");
        std::fs::write(&local, b"").unwrap();

        let stored = LocalDiskStore::new(root.path())
            .put(&local, "local", "")
            .await
            .unwrap();
        assert_eq!(stored.path, "a.csv");
        assert!(root.path().join("local").join("a.csv").exists());
    }

    #[tokio::test]
    async fn test_put_rejects_traversal() {
        let scratch = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let local = scratch.path().join("a.csv");
        std::fs::write(&local, b"x").unwrap();
        let store = LocalDiskStore::new(root.path());

        assert!(matches!(
            store.put(&local, "local", "../escape").await.unwrap_err(),
            QuireError::Validation(_)
        ));
        assert!(matches!(
            store.put(&local, "/abs", "").await.unwrap_err(),
            QuireError::Validation(_)
        ));
        assert!(matches!(
            store.put(&local, "", "").await.unwrap_err(),
            QuireError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_put_missing_local_file_is_storage_error() {
        let root = TempDir::new().unwrap();
        let err = LocalDiskStore::new(root.path())
            .put(&root.path().join("missing.csv"), "local", "")
            .await
            .unwrap_err();
        assert!(matches!(err, QuireError::Storage(_)));
        assert!(err.is_retryable());
    }
}
