// Quire - Partitioned export pipeline
// Copyright (c) 2025 Quire Contributors
// Licensed under the MIT License

//! # Quire - Partitioned export pipeline
//!
//! Quire exports the rows of a query to a single published file. The rows are
//! split into fixed-size pages that are fetched and written in parallel as
//! chunk files; once every page has finished, the chunks are checked against
//! the pages that produced them, merged in page order and published.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Export pipeline (planning, page workers, coordination, collation)
//! - [`adapters`] - Row sources, codecs, artifact store and export repository
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quire::adapters::source::MemorySource;
//! use quire::config::QuireConfig;
//! use quire::core::export::{ExportDefinition, ExportOrchestrator};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = QuireConfig::default();
//!     let orchestrator = ExportOrchestrator::from_config(&config);
//!
//!     let rows = (0..4001).map(|id| json!({"id": id})).collect();
//!     let handle = orchestrator
//!         .plan(
//!             Arc::new(MemorySource::new(rows)),
//!             2000,
//!             ExportDefinition::new("RetailerExport"),
//!         )
//!         .await?;
//!
//!     let report = handle.wait().await?;
//!     println!("{} -> {:?}", report.status, report.filename);
//!     Ok(())
//! }
//! ```
//!
//! ## Failure policy
//!
//! Under the `tolerant` policy a failed page is skipped and the remaining
//! pages are still published. Under `strict` the first failed page cancels
//! the run and nothing is published. Either way, a chunk count that does not
//! match the pages that reported writing one fails the export before any
//! merge starts.
//!
//! ## Error Handling
//!
//! All library operations return [`domain::Result`], carrying a
//! [`domain::QuireError`].

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
