//! Collaborator factory
//!
//! Builds the store and repository implementations selected by configuration.

use crate::adapters::repository::{
    ExportRepository, JsonFileExportRepository, MemoryExportRepository,
};
use crate::adapters::store::{ArtifactStore, LocalDiskStore};
use crate::config::schema::{RepositoryBackend, RepositoryConfig, StoreConfig};
use std::sync::Arc;

/// Create the export repository selected by `repository.backend`
pub fn create_repository(config: &RepositoryConfig) -> Arc<dyn ExportRepository> {
    match config.backend {
        RepositoryBackend::Memory => {
            tracing::info!("Using in-memory export repository");
            Arc::new(MemoryExportRepository::new())
        }
        RepositoryBackend::JsonFile => {
            tracing::info!(path = %config.path, "Using JSON file export repository");
            Arc::new(JsonFileExportRepository::new(&config.path))
        }
    }
}

/// Create the durable artifact store
pub fn create_store(config: &StoreConfig) -> Arc<dyn ArtifactStore> {
    tracing::info!(root = %config.root, "Using local disk artifact store");
    Arc::new(LocalDiskStore::new(&config.root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Export, RunId};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_json_repository_writes_configured_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exports.json");
        let repo = create_repository(&RepositoryConfig {
            backend: RepositoryBackend::JsonFile,
            path: path.to_string_lossy().to_string(),
        });

        repo.create(Export::pending("x", None, 1, RunId::new()))
            .await
            .unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_create_memory_repository() {
        let repo = create_repository(&RepositoryConfig {
            backend: RepositoryBackend::Memory,
            path: String::new(),
        });
        assert!(repo.list().await.unwrap().is_empty());
    }
}
