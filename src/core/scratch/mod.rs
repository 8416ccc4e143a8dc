//! Scratch area for chunk files and merged files
//!
//! The scratch directory is an explicit dependency handed to page workers and
//! the collator; nothing resolves it globally. Within it:
//!
//! ```text
//! <root>/export-<run id>-00000.csv        chunk of page 0
//! <root>/export-<run id>-00000.csv.a1.part  page 0 while attempt 1 writes it
//! <root>/merge-<run id>/<name>-<ts>.csv   merged artifact before publish
//! ```
//!
//! Chunk indices are zero-padded to five digits and always sorted by their
//! numeric value, so collation order never depends on directory listing order.

use crate::domain::{QuireError, Result, RunId};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Width of the zero-padded page index in chunk file names
pub const INDEX_WIDTH: usize = 5;

/// Extension of chunk and merged files
pub const FILE_EXTENSION: &str = "csv";

const PARTIAL_SUFFIX: &str = ".part";

/// One chunk file found in the scratch area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFile {
    /// Page index parsed from the file name
    pub index: u64,
    /// Full path of the chunk file
    pub path: PathBuf,
}

/// Handle on the scratch directory shared by one or more runs
#[derive(Debug, Clone)]
pub struct ChunkStore {
    root: PathBuf,
}

impl ChunkStore {
    /// Creates a handle on `root`; call [`ChunkStore::ensure`] before use
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Scratch directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the scratch directory if missing
    pub async fn ensure(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            QuireError::Io(format!(
                "Failed to create scratch directory {}: {e}",
                self.root.display()
            ))
        })
    }

    /// `export-{run}-{index:05}.csv`
    pub fn chunk_file_name(run: &RunId, index: u64) -> String {
        format!(
            "export-{}-{index:0width$}.{FILE_EXTENSION}",
            run.as_file_component(),
            width = INDEX_WIDTH
        )
    }

    /// Final path of the chunk for page `index`
    pub fn chunk_path(&self, run: &RunId, index: u64) -> PathBuf {
        self.root.join(Self::chunk_file_name(run, index))
    }

    /// Path attempt `attempt` of a page worker writes to before renaming
    /// onto [`ChunkStore::chunk_path`]
    pub fn partial_path(&self, run: &RunId, index: u64, attempt: u32) -> PathBuf {
        self.root.join(format!(
            "{}.a{attempt}{PARTIAL_SUFFIX}",
            Self::chunk_file_name(run, index)
        ))
    }

    /// Complete chunk files of `run`, sorted by page index ascending
    ///
    /// Partial files and files of other runs are ignored.
    pub async fn list_chunks(&self, run: &RunId) -> Result<Vec<ChunkFile>> {
        let pattern = format!(
            r"^export-{}-(\d+)\.{FILE_EXTENSION}$",
            regex::escape(&run.as_file_component())
        );
        let re = Regex::new(&pattern)
            .map_err(|e| QuireError::Other(format!("Invalid chunk pattern: {e}")))?;

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(QuireError::Io(format!(
                    "Failed to list {}: {e}",
                    self.root.display()
                )))
            }
        };

        let mut chunks = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(index) = re
                .captures(name)
                .and_then(|caps| caps[1].parse::<u64>().ok())
            else {
                continue;
            };
            chunks.push(ChunkFile {
                index,
                path: entry.path(),
            });
        }

        chunks.sort_by_key(|c| c.index);
        Ok(chunks)
    }

    /// Delete the given chunk files, returning how many were removed
    ///
    /// Already-missing files are not an error, so this is safe to call more
    /// than once for the same set.
    pub fn remove_chunks(chunks: &[ChunkFile]) -> usize {
        let mut removed = 0;
        for chunk in chunks {
            match std::fs::remove_file(&chunk.path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    path = %chunk.path.display(),
                    error = %e,
                    "Failed to delete chunk file"
                ),
            }
        }
        removed
    }

    /// `{name}-{YYYYmmddHHMMSS}.csv`
    pub fn merged_file_name(name: &str, at: DateTime<Utc>) -> String {
        format!("{name}-{}.{FILE_EXTENSION}", at.format("%Y%m%d%H%M%S"))
    }

    /// Per-run staging directory for the merged artifact
    pub fn merge_dir(&self, run: &RunId) -> PathBuf {
        self.root.join(format!("merge-{}", run.as_file_component()))
    }
}
