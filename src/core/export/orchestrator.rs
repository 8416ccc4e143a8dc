//! Export orchestrator
//!
//! Plans an export: counts the source rows, creates the export record, splits
//! the rows into pages and hands one page worker per page to the batch
//! coordinator. A driver task then follows the run's events, keeping the
//! export record current, and invokes the collator only from the run's
//! success event.

use crate::adapters::codec::{CsvCodec, RowCodec};
use crate::adapters::factory::{create_repository, create_store};
use crate::adapters::repository::{update_export, ExportRepository};
use crate::adapters::source::RowSource;
use crate::adapters::store::ArtifactStore;
use crate::config::schema::{validate_export_name, ExportConfig};
use crate::config::QuireConfig;
use crate::core::export::batch::{BatchEvent, BatchProgress, UnitOutcome};
use crate::core::export::collator::{mark_export_failed, CollateRequest, Collator};
use crate::core::export::coordinator::{BatchCoordinator, BatchHandle};
use crate::core::export::policy::ExportPolicy;
use crate::core::export::summary::{ExportError, ExportErrorType, ExportReport};
use crate::core::export::worker::{PageOutcome, PageWorker};
use crate::core::scratch::ChunkStore;
use crate::domain::{Export, ExportId, OwnerRef, QuireError, Result, RunId};
use crate::{log_error_with_context, log_export_start, log_page_progress};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// What to export and where to publish it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDefinition {
    /// Prefix of the merged file name
    pub name: String,
    /// Recorded on the export record as the producing processor
    pub processor: String,
    /// Store disk the artifact is published to
    pub disk: String,
    /// Directory within the disk
    pub directory: String,
    /// Entity that requested the export
    pub owner: Option<OwnerRef>,
}

impl ExportDefinition {
    /// Definition publishing to the root of the `local` disk
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            processor: name.clone(),
            name,
            disk: "local".to_string(),
            directory: String::new(),
            owner: None,
        }
    }

    /// Definition from the `[export]` configuration section
    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(config.name.clone()).with_destination(&config.disk, &config.directory)
    }

    pub fn with_processor(mut self, processor: impl Into<String>) -> Self {
        self.processor = processor.into();
        self
    }

    pub fn with_destination(
        mut self,
        disk: impl Into<String>,
        directory: impl Into<String>,
    ) -> Self {
        self.disk = disk.into();
        self.directory = directory.into();
        self
    }

    pub fn with_owner(mut self, owner: OwnerRef) -> Self {
        self.owner = Some(owner);
        self
    }
}

impl Default for ExportDefinition {
    fn default() -> Self {
        Self::from_config(&ExportConfig::default())
    }
}

/// Starts export runs against a fixed set of collaborators
#[derive(Clone)]
pub struct ExportOrchestrator {
    repository: Arc<dyn ExportRepository>,
    store: Arc<dyn ArtifactStore>,
    codec: Arc<dyn RowCodec>,
    scratch: ChunkStore,
    coordinator: BatchCoordinator,
}

impl ExportOrchestrator {
    pub fn new(
        repository: Arc<dyn ExportRepository>,
        store: Arc<dyn ArtifactStore>,
        codec: Arc<dyn RowCodec>,
        scratch: ChunkStore,
        policy: ExportPolicy,
    ) -> Self {
        Self {
            repository,
            store,
            codec,
            scratch,
            coordinator: BatchCoordinator::new(policy),
        }
    }

    /// Build an orchestrator with the collaborators selected by `config`
    pub fn from_config(config: &QuireConfig) -> Self {
        Self::new(
            create_repository(&config.repository),
            create_store(&config.store),
            Arc::new(CsvCodec::new()),
            ChunkStore::new(&config.scratch.directory),
            ExportPolicy::from_config(config),
        )
    }

    pub fn repository(&self) -> Arc<dyn ExportRepository> {
        self.repository.clone()
    }

    pub fn policy(&self) -> &ExportPolicy {
        self.coordinator.policy()
    }

    /// Plan and start an export of `source` in pages of `page_size` rows.
    ///
    /// A source with no rows completes immediately without dispatching any
    /// work. Otherwise the returned handle tracks the running batch.
    ///
    /// # Errors
    ///
    /// Fails without creating an export record when the page size or name
    /// is invalid or the source cannot be counted.
    pub async fn plan(
        &self,
        source: Arc<dyn RowSource>,
        page_size: u64,
        definition: ExportDefinition,
    ) -> Result<ExportHandle> {
        if page_size == 0 {
            return Err(QuireError::Validation(
                "page size must be greater than 0".to_string(),
            ));
        }
        validate_export_name(&definition.name).map_err(QuireError::Validation)?;

        let started = Instant::now();
        let total_rows = source.count().await?;

        if total_rows == 0 {
            let export = self
                .repository
                .create(Export::completed_empty(
                    definition.processor.clone(),
                    definition.owner.clone(),
                ))
                .await?;
            tracing::info!(
                export_id = %export.id,
                source = %source.describe(),
                "Source is empty, export completed without paging"
            );

            let mut report = ExportReport::new(export.id, None, definition.name, 0, 0);
            report.status = export.status;
            let report = report.with_duration(started.elapsed());
            report.log_summary();
            return Ok(ExportHandle::finished(report));
        }

        let total_pages = total_rows.div_ceil(page_size);
        let run_id = RunId::new();
        self.scratch.ensure().await?;

        let export = self
            .repository
            .create(Export::pending(
                definition.processor.clone(),
                definition.owner.clone(),
                total_rows,
                run_id,
            ))
            .await?;
        log_export_start!(export.id, run_id, total_rows, total_pages);

        let writers = TaskTracker::new();
        let units: Vec<PageWorker> = (0..total_pages)
            .map(|index| {
                PageWorker::new(
                    index,
                    page_size,
                    run_id,
                    source.clone(),
                    self.codec.clone(),
                    self.scratch.clone(),
                    writers.clone(),
                )
            })
            .collect();

        let cancel = CancellationToken::new();
        let batch = self.coordinator.submit(run_id, units, cancel.clone());

        let report = ExportReport::new(
            export.id,
            Some(run_id),
            definition.name.clone(),
            total_rows,
            total_pages,
        );
        let driver = RunDriver {
            repository: self.repository.clone(),
            collator: Collator::new(
                self.repository.clone(),
                self.store.clone(),
                self.codec.clone(),
                self.scratch.clone(),
                self.policy().retry.clone(),
            ),
            scratch: self.scratch.clone(),
            writers,
            definition,
            cancel: cancel.clone(),
            started,
            report,
        };
        let task = tokio::spawn(driver.run(batch));

        Ok(ExportHandle {
            export_id: export.id,
            run_id: Some(run_id),
            cancel,
            state: HandleState::Running(task),
        })
    }
}

enum HandleState {
    Finished(Box<ExportReport>),
    Running(JoinHandle<ExportReport>),
}

/// Handle on a planned export
pub struct ExportHandle {
    export_id: ExportId,
    run_id: Option<RunId>,
    cancel: CancellationToken,
    state: HandleState,
}

impl ExportHandle {
    fn finished(report: ExportReport) -> Self {
        Self {
            export_id: report.export_id,
            run_id: None,
            cancel: CancellationToken::new(),
            state: HandleState::Finished(Box::new(report)),
        }
    }

    pub fn export_id(&self) -> ExportId {
        self.export_id
    }

    /// Batch run id, `None` when the export completed without paging
    pub fn run_id(&self) -> Option<RunId> {
        self.run_id
    }

    /// Cancel the run. Pages already running finish; the export ends failed.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels the run, for signal handlers
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run to end and return its report
    pub async fn wait(self) -> Result<ExportReport> {
        match self.state {
            HandleState::Finished(report) => Ok(*report),
            HandleState::Running(task) => task
                .await
                .map_err(|e| QuireError::Other(format!("Export driver task failed: {e}"))),
        }
    }
}

/// Follows one batch run to its end
struct RunDriver {
    repository: Arc<dyn ExportRepository>,
    collator: Collator,
    scratch: ChunkStore,
    writers: TaskTracker,
    definition: ExportDefinition,
    cancel: CancellationToken,
    started: Instant,
    report: ExportReport,
}

impl RunDriver {
    async fn run(mut self, mut batch: BatchHandle<PageOutcome>) -> ExportReport {
        let export_id = self.report.export_id;
        let run_id = batch.run_id();

        while let Some(event) = batch.next_event().await {
            match event {
                BatchEvent::Progress(progress) => self.on_progress(run_id, progress).await,
                BatchEvent::Failed { index, error } => {
                    tracing::warn!(
                        export_id = %export_id,
                        run_id = %run_id,
                        page_index = index,
                        error = %error,
                        "Page failed"
                    );
                }
                BatchEvent::Succeeded { progress, outcomes } => {
                    self.report.record_pages(&outcomes);
                    self.settle_writers(run_id).await;
                    self.on_succeeded(run_id, progress, &outcomes).await;
                }
                BatchEvent::Cancelled {
                    outcomes, reason, ..
                } => {
                    self.report.record_pages(&outcomes);
                    self.settle_writers(run_id).await;
                    self.on_cancelled(run_id, reason).await;
                }
            }
        }

        match self.repository.get(export_id).await {
            Ok(export) => {
                if !export.is_terminal() {
                    let error =
                        QuireError::Other("batch run ended without a final event".to_string());
                    self.report
                        .add_error(ExportError::from_error(ExportErrorType::Unknown, &error));
                    mark_export_failed(self.repository.as_ref(), export_id, &error).await;
                }
            }
            Err(e) => {
                log_error_with_context!(e, "Failed to read export after run");
            }
        }
        if let Ok(export) = self.repository.get(export_id).await {
            self.report.status = export.status;
            self.report.filename = export.filename;
        }

        let report = self.report.with_duration(self.started.elapsed());
        report.log_summary();
        report
    }

    /// Wait for chunk writers left behind by timed-out attempts. They never
    /// publish, but scratch is only settled once they have exited.
    async fn settle_writers(&self, run_id: RunId) {
        self.writers.close();
        if !self.writers.is_empty() {
            tracing::debug!(
                run_id = %run_id,
                writers = self.writers.len(),
                "Waiting for abandoned chunk writers"
            );
        }
        self.writers.wait().await;
    }

    async fn on_progress(&self, run_id: RunId, progress: BatchProgress) {
        let export_id = self.report.export_id;
        let started = update_export(self.repository.as_ref(), export_id, |export| {
            export.mark_in_progress().map(|_| ())
        })
        .await;
        if let Err(e) = started {
            log_error_with_context!(
                e,
                format!("Failed to record progress of export {export_id}")
            );
        }
        log_page_progress!(run_id, progress.finished(), progress.total);
    }

    async fn on_succeeded(
        &mut self,
        run_id: RunId,
        progress: BatchProgress,
        outcomes: &[(u64, UnitOutcome<PageOutcome>)],
    ) {
        let export_id = self.report.export_id;

        if progress.succeeded == 0 && progress.failed > 0 {
            let error = QuireError::Other(format!("all {} pages failed", progress.failed));
            mark_export_failed(self.repository.as_ref(), export_id, &error).await;
            self.remove_run_chunks(run_id).await;
            return;
        }

        let expected = outcomes
            .iter()
            .filter(|(_, outcome)| outcome.output().is_some_and(PageOutcome::wrote_chunk))
            .count();

        let request = CollateRequest {
            export_id,
            run_id,
            expected,
            name: self.definition.name.clone(),
            disk: self.definition.disk.clone(),
            directory: self.definition.directory.clone(),
        };

        match self.collator.collate(&request, &self.cancel).await {
            Ok(published) => {
                self.report.rows_merged = published.rows_merged;
                self.report.filename = Some(published.filename);
                self.report.stored = Some(published.stored);
            }
            Err(failure) => {
                self.report
                    .add_error(ExportError::from_error(failure.stage, &failure.error));
            }
        }
    }

    async fn on_cancelled(&mut self, run_id: RunId, reason: Option<QuireError>) {
        let error = match reason {
            Some(error) => error,
            None => {
                let error = QuireError::Cancelled(format!("run {run_id} was cancelled"));
                self.report
                    .add_error(ExportError::from_error(ExportErrorType::Cancelled, &error));
                error
            }
        };
        self.remove_run_chunks(run_id).await;
        mark_export_failed(self.repository.as_ref(), self.report.export_id, &error).await;
    }

    async fn remove_run_chunks(&self, run_id: RunId) {
        match self.scratch.list_chunks(&run_id).await {
            Ok(chunks) if !chunks.is_empty() => {
                let removed = ChunkStore::remove_chunks(&chunks);
                tracing::info!(run_id = %run_id, removed, "Chunk files of stopped run deleted");
            }
            Ok(_) => {}
            Err(e) => {
                log_error_with_context!(e, "Failed to list chunk files for cleanup");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::repository::MemoryExportRepository;
    use crate::adapters::source::MemorySource;
    use crate::adapters::store::LocalDiskStore;
    use crate::domain::ExportStatus;
    use serde_json::json;
    use tempfile::TempDir;

    fn orchestrator(dir: &TempDir) -> ExportOrchestrator {
        ExportOrchestrator::new(
            Arc::new(MemoryExportRepository::new()),
            Arc::new(LocalDiskStore::new(dir.path().join("artifacts"))),
            Arc::new(CsvCodec::new()),
            ChunkStore::new(dir.path().join("scratch")),
            ExportPolicy::default(),
        )
    }

    #[test]
    fn test_definition_defaults() {
        let definition = ExportDefinition::default();
        assert_eq!(definition.name, "export");
        assert_eq!(definition.processor, "export");
        assert_eq!(definition.disk, "local");
        assert_eq!(definition.directory, "");
        assert!(definition.owner.is_none());
    }

    #[tokio::test]
    async fn test_zero_page_size_rejected() {
        let dir = TempDir::new().unwrap();
        let result = orchestrator(&dir)
            .plan(
                Arc::new(MemorySource::new(vec![json!({"id": 1})])),
                0,
                ExportDefinition::new("visits"),
            )
            .await;
        assert!(matches!(result, Err(QuireError::Validation(_))));
    }

    #[tokio::test]
    async fn test_invalid_name_rejected_before_counting() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir);
        let result = orchestrator
            .plan(
                Arc::new(MemorySource::new(Vec::new())),
                10,
                ExportDefinition::new("../escape"),
            )
            .await;
        assert!(matches!(result, Err(QuireError::Validation(_))));
        assert!(orchestrator.repository().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_small_export_completes() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir);
        let rows = (0..5).map(|i| json!({"id": i})).collect();

        let handle = orchestrator
            .plan(
                Arc::new(MemorySource::new(rows)),
                2,
                ExportDefinition::new("visits"),
            )
            .await
            .unwrap();
        assert!(handle.run_id().is_some());
        let report = handle.wait().await.unwrap();

        assert_eq!(report.status, ExportStatus::Completed);
        assert_eq!(report.total_pages, 3);
        assert_eq!(report.pages_written, 3);
        assert_eq!(report.rows_merged, 5);
        assert!(report.filename.unwrap().starts_with("visits-"));
    }
}
