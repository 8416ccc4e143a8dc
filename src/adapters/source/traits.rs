//! Row source abstraction
//!
//! A row source is the originating query of an export. The pipeline only
//! needs two things from it: how many rows there are, and one bounded page
//! at a time.

use crate::domain::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Paged access to the rows of one export query
///
/// Pages are addressed with 0-based indices: page `i` of size `n` holds rows
/// `[i * n, i * n + n)` of the query's stable ordering. Implementations must
/// return the same rows in the same order for the same `(index, size)` while
/// the underlying data is unchanged.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Number of rows the query currently yields
    ///
    /// # Errors
    ///
    /// Returns a source error if the count cannot be obtained.
    async fn count(&self) -> Result<u64>;

    /// Fetch one page of rows
    ///
    /// A page past the end of the data is empty, not an error.
    ///
    /// # Errors
    ///
    /// Returns a source error if the page cannot be fetched.
    async fn page(&self, index: u64, size: u64) -> Result<Vec<Value>>;

    /// Short label used in log lines
    fn describe(&self) -> String {
        "source".to_string()
    }
}

/// Offset of the first row of a page, saturating on overflow
pub fn page_offset(index: u64, size: u64) -> u64 {
    index.saturating_mul(size)
}
