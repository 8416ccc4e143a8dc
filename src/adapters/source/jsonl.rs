//! JSON-lines file row source
//!
//! Each non-blank line of the file is one JSON object row. The file is
//! re-read for every call so pages reflect the file as it is at fetch time.

use crate::adapters::source::traits::{page_offset, RowSource};
use crate::domain::{QuireError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Row source reading a `.jsonl` file
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
}

impl JsonLinesSource {
    /// Creates a source over the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> Result<tokio::io::Lines<BufReader<File>>> {
        let file = File::open(&self.path).await.map_err(|e| {
            QuireError::Source(format!("Failed to open {}: {e}", self.path.display()))
        })?;
        Ok(BufReader::new(file).lines())
    }
}

#[async_trait]
impl RowSource for JsonLinesSource {
    async fn count(&self) -> Result<u64> {
        let mut lines = self.open().await?;
        let mut count = 0u64;
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| QuireError::Source(e.to_string()))?
        {
            if !line.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn page(&self, index: u64, size: u64) -> Result<Vec<Value>> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let offset = page_offset(index, size);
        let mut lines = self.open().await?;
        let mut seen = 0u64;
        let mut line_no = 0u64;
        let mut rows = Vec::new();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| QuireError::Source(e.to_string()))?
        {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            if seen >= offset {
                let row = serde_json::from_str(&line).map_err(|e| {
                    QuireError::Serialization(format!(
                        "{}:{line_no}: invalid JSON row: {e}",
                        self.path.display()
                    ))
                })?;
                rows.push(row);
                if rows.len() as u64 >= size {
                    break;
                }
            }
            seen += 1;
        }

        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("jsonl({})", self.path.display())
    }
}
