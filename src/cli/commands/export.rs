//! Export command implementation
//!
//! This module implements the `export` command, which exports a JSON-lines
//! source file and waits for the published artifact.

use crate::adapters::source::JsonLinesSource;
use crate::config::load_config;
use crate::core::export::{ExportDefinition, ExportOrchestrator, ExportReport, ReconciliationMode};
use crate::domain::{OwnerRef, QuireError};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// JSON-lines file to export, one object per line
    #[arg(short, long)]
    pub source: PathBuf,

    /// Override the export name (prefix of the published file)
    #[arg(long)]
    pub name: Option<String>,

    /// Override rows per page
    #[arg(long)]
    pub page_size: Option<u64>,

    /// Override failure policy (tolerant or strict)
    #[arg(long)]
    pub policy: Option<ReconciliationMode>,

    /// Override the store disk
    #[arg(long)]
    pub disk: Option<String>,

    /// Override the directory within the disk
    #[arg(long)]
    pub directory: Option<String>,

    /// Id of the entity requesting the export
    #[arg(long, requires = "owner_type")]
    pub owner_id: Option<String>,

    /// Kind of the entity requesting the export
    #[arg(long, requires = "owner_id")]
    pub owner_type: Option<String>,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if let Some(name) = &self.name {
            tracing::info!(name = %name, "Overriding export name from CLI");
            config.export.name = name.clone();
        }
        if let Some(page_size) = self.page_size {
            tracing::info!(page_size, "Overriding page size from CLI");
            config.export.page_size = page_size;
        }
        if let Some(policy) = self.policy {
            tracing::info!(policy = %policy, "Overriding policy from CLI");
            config.export.policy = policy;
        }
        if let Some(disk) = &self.disk {
            config.export.disk = disk.clone();
        }
        if let Some(directory) = &self.directory {
            config.export.directory = directory.clone();
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        if !self.source.is_file() {
            eprintln!("Source file not found: {}", self.source.display());
            return Ok(2);
        }

        let mut definition = ExportDefinition::from_config(&config.export);
        if let (Some(id), Some(kind)) = (&self.owner_id, &self.owner_type) {
            definition = definition.with_owner(OwnerRef::new(id, kind));
        }

        let orchestrator = ExportOrchestrator::from_config(&config);
        let source = Arc::new(JsonLinesSource::new(&self.source));

        println!("🚀 Starting export of {}...", self.source.display());
        println!();

        let handle = match orchestrator
            .plan(source, config.export.page_size, definition)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "Export could not be planned");
                eprintln!("Export could not be started: {e}");
                return Ok(match e {
                    QuireError::Validation(_) | QuireError::Configuration(_) => 2,
                    _ => 5,
                });
            }
        };

        let cancel = handle.cancellation_token();
        let watcher = tokio::spawn(async move {
            while shutdown_signal.changed().await.is_ok() {
                if *shutdown_signal.borrow() {
                    tracing::warn!("Shutdown requested, cancelling export");
                    cancel.cancel();
                    break;
                }
            }
        });

        let report = handle.wait().await;
        watcher.abort();

        let report = match report {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                eprintln!("Export failed: {e}");
                return Ok(5);
            }
        };

        print_report(&report);
        Ok(if report.is_successful() { 0 } else { 1 })
    }
}

fn print_report(report: &ExportReport) {
    println!("📊 Export Summary:");
    println!("  Export ID: {}", report.export_id);
    println!("  Status: {}", report.status);
    println!("  Rows: {}", report.total_rows);
    println!(
        "  Pages: {} ({} written, {} empty, {} failed, {} cancelled)",
        report.total_pages,
        report.pages_written,
        report.pages_empty,
        report.pages_failed,
        report.pages_cancelled
    );
    println!("  Rows merged: {}", report.rows_merged);
    if let Some(stored) = &report.stored {
        println!("  Published: {}:{}", stored.disk, stored.path);
        println!("  SHA-256: {}", stored.checksum);
    }
    println!("  Duration: {:.2}s", report.duration.as_secs_f64());

    if !report.errors.is_empty() {
        println!();
        println!("⚠️  Errors ({}):", report.errors.len());
        for error in report.errors.iter().take(10) {
            match &error.context {
                Some(context) => println!("  - [{context}] {}", error.message),
                None => println!("  - {}", error.message),
            }
        }
        if report.errors.len() > 10 {
            println!("  ... and {} more", report.errors.len() - 10);
        }
    }

    println!();
    if report.is_partial() {
        println!("✅ Export completed with missing pages");
    } else if report.is_successful() {
        println!("✅ Export completed");
    } else {
        println!("❌ Export failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn parse(args: &[&str]) -> ExportArgs {
        let mut argv = vec!["quire", "export"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Commands::Export(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_export_args_overrides() {
        let args = parse(&[
            "--source",
            "rows.jsonl",
            "--name",
            "RetailerExport",
            "--page-size",
            "500",
            "--policy",
            "strict",
        ]);
        assert_eq!(args.source, PathBuf::from("rows.jsonl"));
        assert_eq!(args.name.as_deref(), Some("RetailerExport"));
        assert_eq!(args.page_size, Some(500));
        assert_eq!(args.policy, Some(ReconciliationMode::Strict));
    }

    #[test]
    fn test_owner_flags_come_together() {
        let result = Cli::try_parse_from([
            "quire",
            "export",
            "--source",
            "rows.jsonl",
            "--owner-id",
            "42",
        ]);
        assert!(result.is_err());

        let args = parse(&[
            "--source",
            "rows.jsonl",
            "--owner-id",
            "42",
            "--owner-type",
            "Retailer",
        ]);
        assert_eq!(args.owner_id.as_deref(), Some("42"));
        assert_eq!(args.owner_type.as_deref(), Some("Retailer"));
    }

    #[tokio::test]
    async fn test_missing_config_is_configuration_error() {
        let args = parse(&["--source", "rows.jsonl"]);
        let (_tx, rx) = watch::channel(false);
        let code = args
            .execute("/nonexistent/quire.toml", rx)
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
