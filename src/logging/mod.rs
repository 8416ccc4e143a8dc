//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Human-readable console output
//! - JSON-formatted log files with daily, hourly or no rotation
//! - Configurable log levels, overridable through `RUST_LOG`
//!
//! # Example
//!
//! ```no_run
//! use quire::config::LoggingConfig;
//! use quire::logging::init_logging;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! tracing::error!(error = "Something went wrong", "Error occurred");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of an export run
///
/// # Example
///
/// ```no_run
/// use quire::domain::{ExportId, RunId};
/// use quire::log_export_start;
///
/// log_export_start!(ExportId::new(), RunId::new(), 4001, 3);
/// ```
#[macro_export]
macro_rules! log_export_start {
    ($export_id:expr, $run_id:expr, $total_rows:expr, $total_pages:expr) => {
        tracing::info!(
            export_id = %$export_id,
            run_id = %$run_id,
            total_rows = $total_rows,
            total_pages = $total_pages,
            "Starting export"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use quire::domain::QuireError;
/// use quire::log_error_with_context;
///
/// let error = QuireError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = %$context,
            "Error occurred"
        );
    };
}

/// Log how many units of a batch run have finished
///
/// # Example
///
/// ```no_run
/// use quire::domain::RunId;
/// use quire::log_page_progress;
///
/// log_page_progress!(RunId::new(), 2, 3);
/// ```
#[macro_export]
macro_rules! log_page_progress {
    ($run_id:expr, $finished:expr, $total:expr) => {
        tracing::debug!(
            run_id = %$run_id,
            finished = $finished,
            total = $total,
            progress_pct = ($finished as f64 / ($total as f64).max(1.0) * 100.0),
            "Page finished"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use quire::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
