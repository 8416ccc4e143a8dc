//! Export repository abstraction
//!
//! Persists [`Export`] records. Status changes go through
//! [`ExportRepository::update`], which applies a mutation closure as one
//! atomic read-modify-write: either the mutated record is stored, or the
//! closure's error is returned and the stored record is unchanged.

use crate::domain::{Export, ExportId, Result};
use async_trait::async_trait;

/// Mutation applied to one export record inside [`ExportRepository::update`]
pub type ExportMutation = Box<dyn FnOnce(&mut Export) -> Result<()> + Send>;

/// Persistent store of export records
#[async_trait]
pub trait ExportRepository: Send + Sync {
    /// Insert a new record
    ///
    /// # Errors
    ///
    /// Returns a validation error if a record with the same id exists.
    async fn create(&self, export: Export) -> Result<Export>;

    /// Fetch a record by id
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record has this id.
    async fn get(&self, id: ExportId) -> Result<Export>;

    /// Atomically apply `mutation` to the stored record and return the result
    async fn update(&self, id: ExportId, mutation: ExportMutation) -> Result<Export>;

    /// All records, oldest first
    async fn list(&self) -> Result<Vec<Export>>;
}

/// Convenience wrapper so callers can pass plain closures to `update`
pub async fn update_export<F>(
    repository: &dyn ExportRepository,
    id: ExportId,
    mutation: F,
) -> Result<Export>
where
    F: FnOnce(&mut Export) -> Result<()> + Send + 'static,
{
    repository.update(id, Box::new(mutation)).await
}
