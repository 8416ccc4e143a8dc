//! Core business logic for Quire.
//!
//! This module contains the export pipeline itself; collaborators it talks
//! to live in [`crate::adapters`].
//!
//! # Modules
//!
//! - [`export`] - Planning, page workers, batch coordination and collation
//! - [`scratch`] - Chunk file naming and the scratch directory
//! - [`verification`] - SHA-256 checksums for published artifacts
//!
//! # Export Workflow
//!
//! 1. **Count**: Ask the row source how many rows the export covers
//! 2. **Plan**: Create the export record and one page worker per page
//! 3. **Page**: Workers fetch pages in parallel and write chunk files
//! 4. **Barrier**: The coordinator waits for every worker to finish
//! 5. **Reconcile**: The collator checks the chunk count against the pages that wrote one
//! 6. **Merge**: Chunks are concatenated in page order
//! 7. **Publish**: The merged file goes to the artifact store and the export completes
//!
//! # Example
//!
//! ```rust,no_run
//! use quire::adapters::source::JsonLinesSource;
//! use quire::config::load_config;
//! use quire::core::export::{ExportDefinition, ExportOrchestrator};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("quire.toml")?;
//! let orchestrator = ExportOrchestrator::from_config(&config);
//!
//! let handle = orchestrator
//!     .plan(
//!         Arc::new(JsonLinesSource::new("visits.jsonl")),
//!         config.export.page_size,
//!         ExportDefinition::from_config(&config.export),
//!     )
//!     .await?;
//! let report = handle.wait().await?;
//!
//! println!("Status: {}", report.status);
//! println!("Rows merged: {}", report.rows_merged);
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod scratch;
pub mod verification;
