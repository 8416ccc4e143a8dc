//! Collaborators of the export pipeline.
//!
//! - [`source`] - Row sources (the query an export reads from)
//! - [`codec`] - Row codecs for chunk and merged files
//! - [`store`] - Durable artifact store
//! - [`repository`] - Export record persistence
//! - [`factory`] - Configuration-driven construction
//!
//! # Design Pattern
//!
//! Each collaborator sits behind a trait so the pipeline can be exercised
//! against in-memory implementations in tests and swapped for other
//! backends without touching the core.
//!
//! ```rust,no_run
//! use quire::adapters::source::{JsonLinesSource, RowSource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = JsonLinesSource::new("visits.jsonl");
//! let total = source.count().await?;
//! let first_page = source.page(0, 2000).await?;
//! println!("{total} rows, first page has {}", first_page.len());
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod factory;
pub mod repository;
pub mod source;
pub mod store;
