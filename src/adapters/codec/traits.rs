//! Row codec abstraction
//!
//! Codecs are synchronous; callers on the async runtime run them inside
//! `tokio::task::spawn_blocking`.

use crate::domain::{Result, Row};
use std::path::Path;

/// Streaming writer for one row file
pub trait RowWriter: Send {
    /// Append one row
    fn add_row(&mut self, row: &Row) -> Result<()>;

    /// Append rows in order
    fn add_rows(&mut self, rows: &[Row]) -> Result<()> {
        for row in rows {
            self.add_row(row)?;
        }
        Ok(())
    }

    /// Flush and finalize the file, returning the number of data rows written
    ///
    /// A writer that is dropped without `close()` may leave a truncated file.
    fn close(self: Box<Self>) -> Result<u64>;
}

/// Lazy, finite, non-restartable sequence of rows read from one file
pub type RowReader = Box<dyn Iterator<Item = Result<Row>> + Send>;

/// Factory for row writers and readers of one file format
pub trait RowCodec: Send + Sync {
    /// Open a new writer, truncating any existing file at `path`
    fn writer(&self, path: &Path) -> Result<Box<dyn RowWriter>>;

    /// Open a lazy reader over the file at `path`
    fn reader(&self, path: &Path) -> Result<RowReader>;
}
