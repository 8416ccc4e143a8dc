//! Configuration management for Quire.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Quire uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `QUIRE_<SECTION>_<KEY>` environment overrides
//! - Default values for every setting
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use quire::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("quire.toml")?;
//!
//! println!("Page size: {}", config.export.page_size);
//! println!("Policy: {}", config.export.policy);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Application settings (name, log level)
//! - [`ExportConfig`] - Export name, page size, policy and destination
//! - [`RetryConfig`] - Attempts, timeouts and backoff
//! - [`CoordinatorConfig`] - Page worker concurrency
//! - [`ScratchConfig`] - Scratch directory for chunk files
//! - [`StoreConfig`] - Durable artifact store
//! - [`RepositoryConfig`] - Export record persistence
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [export]
//! name = "RetailerExport"
//! page_size = 2000
//! policy = "strict"
//! disk = "local"
//! directory = "exports"
//!
//! [retry]
//! max_attempts = 6
//! attempt_timeout_secs = 90
//!
//! [scratch]
//! directory = "${QUIRE_SCRATCH}"
//! ```

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use loader::{load_config, load_config_str};
pub use schema::{
    ApplicationConfig, CoordinatorConfig, ExportConfig, LoggingConfig, QuireConfig,
    RepositoryBackend, RepositoryConfig, RetryConfig, ScratchConfig, StoreConfig,
};
