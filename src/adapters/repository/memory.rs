//! In-memory export repository

use crate::adapters::repository::traits::{ExportMutation, ExportRepository};
use crate::domain::{Export, ExportId, QuireError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Export repository held in process memory
#[derive(Debug, Default)]
pub struct MemoryExportRepository {
    records: Mutex<HashMap<ExportId, Export>>,
}

impl MemoryExportRepository {
    /// Creates an empty repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExportRepository for MemoryExportRepository {
    async fn create(&self, export: Export) -> Result<Export> {
        let mut records = self.records.lock().await;
        if records.contains_key(&export.id) {
            return Err(QuireError::Validation(format!(
                "Export {} already exists",
                export.id
            )));
        }
        records.insert(export.id, export.clone());
        Ok(export)
    }

    async fn get(&self, id: ExportId) -> Result<Export> {
        self.records
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| QuireError::NotFound(format!("Export {id}")))
    }

    async fn update(&self, id: ExportId, mutation: ExportMutation) -> Result<Export> {
        let mut records = self.records.lock().await;
        let stored = records
            .get_mut(&id)
            .ok_or_else(|| QuireError::NotFound(format!("Export {id}")))?;

        let mut draft = stored.clone();
        mutation(&mut draft)?;
        *stored = draft.clone();
        Ok(draft)
    }

    async fn list(&self) -> Result<Vec<Export>> {
        let mut all: Vec<Export> = self.records.lock().await.values().cloned().collect();
        all.sort_by_key(|e| e.created_at);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::repository::traits::update_export;
    use crate::domain::{ExportStatus, RunId};

    #[tokio::test]
    async fn test_create_get_update() {
        let repo = MemoryExportRepository::new();
        let export = repo
            .create(Export::pending("Visits", None, 10, RunId::new()))
            .await
            .unwrap();

        let updated = update_export(&repo, export.id, |e| e.mark_in_progress().map(|_| ()))
            .await
            .unwrap();
        assert_eq!(updated.status, ExportStatus::InProgress);
        assert_eq!(repo.get(export.id).await.unwrap().status, ExportStatus::InProgress);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_record_unchanged() {
        let repo = MemoryExportRepository::new();
        let export = repo
            .create(Export::pending("Visits", None, 10, RunId::new()))
            .await
            .unwrap();

        let err = update_export(&repo, export.id, |e| e.mark_completed("x.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, QuireError::InvalidTransition { .. }));

        let stored = repo.get(export.id).await.unwrap();
        assert_eq!(stored, export);
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let repo = MemoryExportRepository::new();
        let export = Export::pending("Visits", None, 1, RunId::new());
        repo.create(export.clone()).await.unwrap();
        assert!(repo.create(export).await.is_err());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let repo = MemoryExportRepository::new();
        assert!(matches!(
            repo.get(ExportId::new()).await.unwrap_err(),
            QuireError::NotFound(_)
        ));
    }
}
