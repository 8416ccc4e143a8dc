//! Collation of chunk files into the published artifact
//!
//! The collator runs once per batch run, after every page worker has reached
//! a terminal outcome. It:
//!
//! 1. reconciles the chunk files on disk against the number of pages that
//!    reported writing one
//! 2. merges them in page order into a single file
//! 3. deletes the chunk files
//! 4. publishes the merged file and marks the export completed
//!
//! A reconciliation mismatch is terminal. It is never retried: the export is
//! marked failed, the run is cancelled and the chunk files are deleted.

use crate::adapters::codec::RowCodec;
use crate::adapters::repository::{update_export, ExportRepository};
use crate::adapters::store::{ArtifactStore, StoredReference};
use crate::core::export::policy::RetryPolicy;
use crate::core::export::retry::run_with_retry;
use crate::core::export::summary::ExportErrorType;
use crate::core::scratch::{ChunkFile, ChunkStore};
use crate::domain::{ExportId, QuireError, Result, RunId};
use thiserror::Error;
use crate::log_error_with_context;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything the collator needs to finish one run
#[derive(Debug, Clone)]
pub struct CollateRequest {
    pub export_id: ExportId,
    pub run_id: RunId,
    /// Number of page workers that reported writing a chunk
    pub expected: usize,
    /// Export name, used as the merged file name prefix
    pub name: String,
    pub disk: String,
    pub directory: String,
}

/// Result of a successful collation
#[derive(Debug, Clone)]
pub struct Published {
    pub filename: String,
    pub stored: StoredReference,
    pub rows_merged: u64,
    pub chunks_merged: usize,
}

/// Why a collation failed and the step it failed in
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("collation failed at {stage:?}: {error}")]
pub struct CollateFailure {
    pub stage: ExportErrorType,
    pub error: QuireError,
}

/// Deletes the chunk files it holds when dropped
struct ChunkCleanup {
    chunks: Vec<ChunkFile>,
}

impl Drop for ChunkCleanup {
    fn drop(&mut self) {
        let removed = ChunkStore::remove_chunks(&self.chunks);
        tracing::debug!(removed, "Chunk files removed");
    }
}

/// Merges, publishes and records the outcome of a finished batch run
pub struct Collator {
    repository: Arc<dyn ExportRepository>,
    store: Arc<dyn ArtifactStore>,
    codec: Arc<dyn RowCodec>,
    scratch: ChunkStore,
    retry: RetryPolicy,
}

impl Collator {
    pub fn new(
        repository: Arc<dyn ExportRepository>,
        store: Arc<dyn ArtifactStore>,
        codec: Arc<dyn RowCodec>,
        scratch: ChunkStore,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            repository,
            store,
            codec,
            scratch,
            retry,
        }
    }

    /// Collate the chunks of `request.run_id`.
    ///
    /// On any error the export record has already been marked failed when
    /// this returns. `cancel` is the run's token; it is cancelled on a
    /// reconciliation mismatch and stops merge and publish retries.
    pub async fn collate(
        &self,
        request: &CollateRequest,
        cancel: &CancellationToken,
    ) -> std::result::Result<Published, CollateFailure> {
        let scratch = &self.scratch;
        let run_id = &request.run_id;
        let chunks = match run_with_retry("list chunks", &self.retry, cancel, move |_| {
            scratch.list_chunks(run_id)
        })
        .await
        {
            Ok(chunks) => chunks,
            Err(error) => return Err(self.fail(request, ExportErrorType::Listing, error).await),
        };

        if chunks.len() != request.expected {
            let error = QuireError::Reconciliation {
                expected: request.expected,
                found: chunks.len(),
            };
            tracing::error!(
                export_id = %request.export_id,
                run_id = %request.run_id,
                expected = request.expected,
                found = chunks.len(),
                "Chunk files do not match completed pages, cancelling run"
            );
            cancel.cancel();
            let removed = ChunkStore::remove_chunks(&chunks);
            tracing::info!(run_id = %request.run_id, removed, "Chunk files deleted");
            return Err(self
                .fail(request, ExportErrorType::Reconciliation, error)
                .await);
        }

        let cleanup = ChunkCleanup {
            chunks: chunks.clone(),
        };
        let filename = ChunkStore::merged_file_name(&request.name, Utc::now());
        let merge_dir = self.scratch.merge_dir(&request.run_id);
        let merged_path = merge_dir.join(&filename);

        let rows_merged = match self.merge(&chunks, &merged_path, cancel).await {
            Ok(rows) => rows,
            Err(error) => {
                drop(cleanup);
                remove_merge_dir(&merge_dir).await;
                return Err(self.fail(request, ExportErrorType::Merge, error).await);
            }
        };
        drop(cleanup);

        tracing::info!(
            run_id = %request.run_id,
            chunks = chunks.len(),
            rows = rows_merged,
            file = %filename,
            "Chunks merged"
        );

        let store = self.store.as_ref();
        let local_path = merged_path.as_path();
        let (disk, directory) = (request.disk.as_str(), request.directory.as_str());
        let published = run_with_retry("publish", &self.retry, cancel, move |_| {
            store.put(local_path, disk, directory)
        })
        .await;
        remove_merge_dir(&merge_dir).await;

        let stored = match published {
            Ok(stored) => stored,
            Err(error) => return Err(self.fail(request, ExportErrorType::Publish, error).await),
        };

        let repository = self.repository.as_ref();
        let export_id = request.export_id;
        let completed_name = filename.clone();
        let recorded = run_with_retry("record completion", &self.retry, cancel, move |_| {
            let name = completed_name.clone();
            update_export(repository, export_id, move |export| export.mark_completed(name))
        })
        .await;
        if let Err(error) = recorded {
            return Err(self
                .fail(request, ExportErrorType::Repository, error)
                .await);
        }

        tracing::info!(
            export_id = %request.export_id,
            disk = %stored.disk,
            path = %stored.path,
            size_bytes = stored.size_bytes,
            "Export published"
        );

        Ok(Published {
            filename,
            stored,
            rows_merged,
            chunks_merged: chunks.len(),
        })
    }

    async fn merge(
        &self,
        chunks: &[ChunkFile],
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        run_with_retry("merge", &self.retry, cancel, |_| {
            let codec = self.codec.clone();
            let chunks = chunks.to_vec();
            let output = output.to_path_buf();
            async move {
                tokio::task::spawn_blocking(move || {
                    merge_chunks(codec.as_ref(), &chunks, &output)
                })
                .await
                .map_err(|e| QuireError::Io(format!("Merge task failed: {e}")))?
            }
        })
        .await
    }

    async fn fail(
        &self,
        request: &CollateRequest,
        stage: ExportErrorType,
        error: QuireError,
    ) -> CollateFailure {
        mark_export_failed(self.repository.as_ref(), request.export_id, &error).await;
        CollateFailure { stage, error }
    }
}

/// Concatenate `chunks` (already in page order) into `output`
fn merge_chunks(codec: &dyn RowCodec, chunks: &[ChunkFile], output: &Path) -> Result<u64> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = codec.writer(output)?;
    for chunk in chunks {
        for row in codec.reader(&chunk.path)? {
            writer.add_row(&row?)?;
        }
    }
    writer.close()
}

async fn remove_merge_dir(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                path = %dir.display(),
                error = %e,
                "Failed to remove merge directory"
            );
        }
    }
}

/// Move the export to `Failed`, logging rather than propagating repository errors
pub(crate) async fn mark_export_failed(
    repository: &dyn ExportRepository,
    id: ExportId,
    reason: &QuireError,
) {
    match update_export(repository, id, |export| export.mark_failed().map(|_| ())).await {
        Ok(_) => tracing::error!(export_id = %id, reason = %reason, "Export failed"),
        Err(e) => {
            log_error_with_context!(e, format!("Failed to mark export {id} as failed"));
        }
    }
}
