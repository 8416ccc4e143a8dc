//! In-memory row source

use crate::adapters::source::traits::{page_offset, RowSource};
use crate::domain::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Row source backed by a vector of JSON rows
///
/// Cloning is cheap; clones share the same rows.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    rows: Arc<Vec<Value>>,
    reported_count: Option<u64>,
}

impl MemorySource {
    /// Creates a source over the given rows
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows: Arc::new(rows),
            reported_count: None,
        }
    }

    /// Makes `count()` report `count` regardless of the stored rows.
    ///
    /// Models a source whose row estimate raced with concurrent deletes.
    pub fn with_reported_count(mut self, count: u64) -> Self {
        self.reported_count = Some(count);
        self
    }

    /// Number of rows actually stored
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows are stored
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl RowSource for MemorySource {
    async fn count(&self) -> Result<u64> {
        Ok(self.reported_count.unwrap_or(self.rows.len() as u64))
    }

    async fn page(&self, index: u64, size: u64) -> Result<Vec<Value>> {
        let offset = usize::try_from(page_offset(index, size)).unwrap_or(usize::MAX);
        let size = usize::try_from(size).unwrap_or(usize::MAX);
        Ok(self.rows.iter().skip(offset).take(size).cloned().collect())
    }

    fn describe(&self) -> String {
        format!("memory({} rows)", self.rows.len())
    }
}
