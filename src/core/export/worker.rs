//! Page worker
//!
//! Fetches one page from the row source and writes it as one chunk file. The
//! chunk only appears under its final name once it is complete, so the
//! collator never counts a half-written file.
//!
//! The blocking writer outlives its attempt when the attempt times out. Such
//! an abandoned writer never publishes: it removes its partial file instead,
//! and a chunk it already renamed is taken back. Writers are spawned on the
//! run's [`TaskTracker`] so the run can wait for stragglers before collation.

use crate::adapters::codec::RowCodec;
use crate::adapters::source::RowSource;
use crate::core::export::coordinator::WorkUnit;
use crate::core::scratch::ChunkStore;
use crate::domain::{QuireError, Result, Row, RunId};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::task::TaskTracker;

/// What a page worker left behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// A chunk file with `rows` data rows was written
    Written { rows: u64 },
    /// The page came back empty and no chunk was written
    Empty,
}

impl PageOutcome {
    pub fn wrote_chunk(&self) -> bool {
        matches!(self, PageOutcome::Written { .. })
    }
}

/// Work unit for page `index` of a run
pub struct PageWorker {
    index: u64,
    page_size: u64,
    run_id: RunId,
    source: Arc<dyn RowSource>,
    codec: Arc<dyn RowCodec>,
    scratch: ChunkStore,
    writers: TaskTracker,
}

impl PageWorker {
    /// `writers` tracks the blocking chunk writers of the whole run
    pub fn new(
        index: u64,
        page_size: u64,
        run_id: RunId,
        source: Arc<dyn RowSource>,
        codec: Arc<dyn RowCodec>,
        scratch: ChunkStore,
        writers: TaskTracker,
    ) -> Self {
        Self {
            index,
            page_size,
            run_id,
            source,
            codec,
            scratch,
            writers,
        }
    }
}

#[async_trait]
impl WorkUnit for PageWorker {
    type Output = PageOutcome;

    fn index(&self) -> u64 {
        self.index
    }

    async fn run(&self, attempt: u32) -> Result<PageOutcome> {
        let values = self.source.page(self.index, self.page_size).await?;
        if values.is_empty() {
            tracing::debug!(
                run_id = %self.run_id,
                page = self.index,
                "Page returned no rows, no chunk written"
            );
            return Ok(PageOutcome::Empty);
        }

        let rows = values
            .into_iter()
            .map(Row::from_value)
            .collect::<Result<Vec<_>>>()?;

        let codec = self.codec.clone();
        let partial = self.scratch.partial_path(&self.run_id, self.index, attempt);
        let target = self.scratch.chunk_path(&self.run_id, self.index);

        let gate = Arc::new(PublishGate::new(target));
        let attempt_guard = AttemptGuard::new(gate.clone());
        let joined = self
            .writers
            .spawn_blocking(move || write_chunk(codec.as_ref(), &rows, &partial, &gate))
            .await;
        attempt_guard.settle();
        let written =
            joined.map_err(|e| QuireError::Io(format!("Chunk writer task failed: {e}")))??;

        tracing::debug!(
            run_id = %self.run_id,
            page = self.index,
            attempt,
            rows = written,
            "Chunk written"
        );
        Ok(PageOutcome::Written { rows: written })
    }
}

/// Publication state shared by one attempt and its blocking writer
#[derive(Debug, Default)]
struct GateState {
    abandoned: bool,
    published: bool,
}

/// Lets a chunk writer rename onto the chunk name only while its attempt
/// is still waiting for it
#[derive(Debug)]
struct PublishGate {
    target: PathBuf,
    state: Mutex<GateState>,
}

impl PublishGate {
    fn new(target: PathBuf) -> Self {
        Self {
            target,
            state: Mutex::new(GateState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rename `partial` onto the chunk name unless the attempt was abandoned
    fn publish(&self, partial: &Path) -> Result<()> {
        let mut state = self.lock();
        if state.abandoned {
            return Err(QuireError::Cancelled(format!(
                "attempt writing {} was abandoned",
                self.target.display()
            )));
        }
        std::fs::rename(partial, &self.target)?;
        state.published = true;
        Ok(())
    }

    /// Stop the writer from publishing, and take back a chunk it already
    /// published that its attempt never accounted for
    fn abandon(&self) {
        let mut state = self.lock();
        state.abandoned = true;
        if state.published {
            match std::fs::remove_file(&self.target) {
                Ok(()) => tracing::debug!(
                    path = %self.target.display(),
                    "Chunk of abandoned attempt removed"
                ),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    path = %self.target.display(),
                    error = %e,
                    "Failed to remove chunk of abandoned attempt"
                ),
            }
            state.published = false;
        }
    }
}

/// Abandons the gate when the attempt future is dropped before its writer
/// reported back
struct AttemptGuard {
    gate: Arc<PublishGate>,
    settled: bool,
}

impl AttemptGuard {
    fn new(gate: Arc<PublishGate>) -> Self {
        Self {
            gate,
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        if !self.settled {
            self.gate.abandon();
        }
    }
}

fn write_chunk(
    codec: &dyn RowCodec,
    rows: &[Row],
    partial: &Path,
    gate: &PublishGate,
) -> Result<u64> {
    let result = codec.writer(partial).and_then(|mut writer| {
        writer.add_rows(rows)?;
        let count = writer.close()?;
        gate.publish(partial)?;
        Ok(count)
    });

    if result.is_err() {
        if let Err(e) = std::fs::remove_file(partial) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %partial.display(),
                    error = %e,
                    "Failed to remove partial chunk"
                );
            }
        }
    }
    result
}
