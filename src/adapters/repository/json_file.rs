//! JSON file export repository
//!
//! The whole record set is one JSON array on disk. Every write serializes
//! the full set to `<path>.tmp` and renames it over `<path>`, so readers
//! never observe a half-written file. A process-local mutex serializes
//! read-modify-write cycles.

use crate::adapters::repository::traits::{ExportMutation, ExportRepository};
use crate::domain::{Export, ExportId, QuireError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Export repository persisted to a single JSON file
#[derive(Debug)]
pub struct JsonFileExportRepository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileExportRepository {
    /// Creates a repository backed by `path`; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<Export>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                QuireError::Repository(format!(
                    "Corrupt export file {}: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(QuireError::Repository(format!(
                "Failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn save(&self, records: &[Export]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                QuireError::Repository(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let body = serde_json::to_vec_pretty(records)?;
        tokio::fs::write(&tmp, body).await.map_err(|e| {
            QuireError::Repository(format!("Failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            QuireError::Repository(format!("Failed to replace {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl ExportRepository for JsonFileExportRepository {
    async fn create(&self, export: Export) -> Result<Export> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        if records.iter().any(|r| r.id == export.id) {
            return Err(QuireError::Validation(format!(
                "Export {} already exists",
                export.id
            )));
        }
        records.push(export.clone());
        self.save(&records).await?;
        Ok(export)
    }

    async fn get(&self, id: ExportId) -> Result<Export> {
        let _guard = self.lock.lock().await;
        self.load()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| QuireError::NotFound(format!("Export {id}")))
    }

    async fn update(&self, id: ExportId, mutation: ExportMutation) -> Result<Export> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let stored = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| QuireError::NotFound(format!("Export {id}")))?;

        let mut draft = stored.clone();
        mutation(&mut draft)?;
        *stored = draft.clone();
        self.save(&records).await?;
        Ok(draft)
    }

    async fn list(&self) -> Result<Vec<Export>> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.sort_by_key(|e| e.created_at);
        Ok(records)
    }
}
