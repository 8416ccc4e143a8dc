//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use quire::adapters::codec::{CsvCodec, RowCodec, RowReader, RowWriter};
use quire::adapters::repository::MemoryExportRepository;
use quire::adapters::source::{MemorySource, RowSource};
use quire::adapters::store::LocalDiskStore;
use quire::core::export::{
    ExportOrchestrator, ExportPolicy, ExportReport, ReconciliationMode, RetryPolicy,
};
use quire::core::scratch::ChunkStore;
use quire::domain::{QuireError, Result, Row};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// `n` rows of `{"id": i, "name": "row-i"}`
pub fn rows(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| json!({"id": i, "name": format!("row-{i}")}))
        .collect()
}

/// Retry policy with millisecond backoff so failing tests stay fast
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        attempt_timeout: Duration::from_secs(10),
        deadline: Duration::from_secs(60),
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        multiplier: 2.0,
        jitter: false,
    }
}

pub fn policy(mode: ReconciliationMode) -> ExportPolicy {
    ExportPolicy {
        reconciliation: mode,
        retry: fast_retry(3),
        max_concurrency: 4,
    }
}

/// Isolated scratch, store and repository for one test
pub struct Harness {
    pub dir: TempDir,
    pub repository: Arc<MemoryExportRepository>,
    pub store: Arc<LocalDiskStore>,
    pub scratch: ChunkStore,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let store = Arc::new(LocalDiskStore::new(dir.path().join("artifacts")));
        let scratch = ChunkStore::new(dir.path().join("scratch"));
        Self {
            dir,
            repository: Arc::new(MemoryExportRepository::new()),
            store,
            scratch,
        }
    }

    pub fn orchestrator(&self, policy: ExportPolicy) -> ExportOrchestrator {
        self.orchestrator_with_codec(policy, Arc::new(CsvCodec::new()))
    }

    pub fn orchestrator_with_codec(
        &self,
        policy: ExportPolicy,
        codec: Arc<dyn RowCodec>,
    ) -> ExportOrchestrator {
        ExportOrchestrator::new(
            self.repository.clone(),
            self.store.clone(),
            codec,
            self.scratch.clone(),
            policy,
        )
    }

    /// Local path of the published artifact of `report`
    pub fn artifact_path(&self, report: &ExportReport) -> PathBuf {
        let stored = report.stored.as_ref().expect("report has a stored artifact");
        self.store.resolve(stored)
    }

    /// Everything left in the scratch directory
    pub fn scratch_entries(&self) -> Vec<PathBuf> {
        list_files(self.scratch.root())
    }

    /// Every file published to the store
    pub fn published_files(&self) -> Vec<PathBuf> {
        list_files(self.store.root())
    }
}

fn list_files(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = std::fs::read_dir(root) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(list_files(&path));
            if std::fs::read_dir(&path).map(|mut d| d.next().is_none()).unwrap_or(false) {
                found.push(path);
            }
        } else {
            found.push(path);
        }
    }
    found
}

/// Data lines of a CSV file, header excluded
pub fn data_lines(path: &Path) -> Vec<String> {
    let content = std::fs::read_to_string(path).expect("artifact readable");
    content.lines().skip(1).map(str::to_string).collect()
}

/// Row source that fails chosen pages, either a set number of times or always
pub struct FlakySource {
    inner: MemorySource,
    always: HashSet<u64>,
    remaining: Mutex<HashMap<u64, u32>>,
    delay: Duration,
    pub page_calls: AtomicU64,
}

impl FlakySource {
    pub fn new(inner: MemorySource) -> Self {
        Self {
            inner,
            always: HashSet::new(),
            remaining: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            page_calls: AtomicU64::new(0),
        }
    }

    pub fn fail_always(mut self, page: u64) -> Self {
        self.always.insert(page);
        self
    }

    pub fn fail_times(self, page: u64, times: u32) -> Self {
        self.remaining
            .lock()
            .expect("lock")
            .insert(page, times);
        self
    }

    /// Sleep before answering every page request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u64 {
        self.page_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RowSource for FlakySource {
    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }

    async fn page(&self, index: u64, size: u64) -> Result<Vec<Value>> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.always.contains(&index) {
            return Err(QuireError::Source(format!("page {index} unavailable")));
        }
        {
            let mut remaining = self.remaining.lock().expect("lock");
            if let Some(left) = remaining.get_mut(&index) {
                if *left > 0 {
                    *left -= 1;
                    return Err(QuireError::Source(format!("page {index} timed out")));
                }
            }
        }
        self.inner.page(index, size).await
    }

    fn describe(&self) -> String {
        "flaky memory source".to_string()
    }
}

/// CSV codec whose first `slow_writers` writers stall in `close()`
pub struct SlowCloseCodec {
    inner: CsvCodec,
    slow_writers: u64,
    stall: Duration,
    opened: AtomicU64,
}

impl SlowCloseCodec {
    pub fn new(slow_writers: u64, stall: Duration) -> Self {
        Self {
            inner: CsvCodec::new(),
            slow_writers,
            stall,
            opened: AtomicU64::new(0),
        }
    }
}

impl RowCodec for SlowCloseCodec {
    fn writer(&self, path: &Path) -> Result<Box<dyn RowWriter>> {
        let inner = self.inner.writer(path)?;
        let stall = if self.opened.fetch_add(1, Ordering::SeqCst) < self.slow_writers {
            self.stall
        } else {
            Duration::ZERO
        };
        Ok(Box::new(StallingWriter { inner, stall }))
    }

    fn reader(&self, path: &Path) -> Result<RowReader> {
        self.inner.reader(path)
    }
}

struct StallingWriter {
    inner: Box<dyn RowWriter>,
    stall: Duration,
}

impl RowWriter for StallingWriter {
    fn add_row(&mut self, row: &Row) -> Result<()> {
        self.inner.add_row(row)
    }

    fn close(self: Box<Self>) -> Result<u64> {
        // Runs on a blocking thread
        std::thread::sleep(self.stall);
        self.inner.close()
    }
}
