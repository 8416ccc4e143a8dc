//! Status command implementation
//!
//! This module implements the `status` command for displaying persisted
//! export records.

use crate::adapters::factory::create_repository;
use crate::config::load_config;
use crate::domain::{Export, ExportId, ExportStatus};
use clap::Args;
use std::str::FromStr;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show a single export by id
    #[arg(long)]
    pub id: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking export status");

        println!("📊 Export Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let id = match self.id.as_deref().map(ExportId::from_str).transpose() {
            Ok(id) => id,
            Err(e) => {
                println!("❌ Invalid export id");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let repository = create_repository(&config.repository);
        let exports = match id {
            Some(id) => repository.get(id).await.map(|export| vec![export]),
            None => repository.list().await,
        };
        let exports = match exports {
            Ok(exports) => exports,
            Err(e) => {
                println!("❌ Failed to load export records");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        if exports.is_empty() {
            println!("No export history found.");
            println!("Run 'quire export --source <file>' to start exporting data.");
            return Ok(0);
        }

        println!("Found {} export(s):", exports.len());
        println!();
        println!(
            "{:<38} {:<20} {:<16} {:<10} {:<40} {:<20}",
            "Export ID", "Processor", "Status", "Rows", "File", "Completed"
        );
        println!("{}", "-".repeat(148));

        for export in &exports {
            println!("{}", format_row(export));
        }

        println!();
        Ok(0)
    }
}

fn status_label(status: ExportStatus) -> String {
    let icon = match status {
        ExportStatus::Completed => "✅",
        ExportStatus::InProgress => "🔄",
        ExportStatus::Failed => "❌",
        ExportStatus::Pending => "⏳",
        ExportStatus::Stopping | ExportStatus::Stopped => "⏸️",
    };
    format!("{icon} {status}")
}

fn format_row(export: &Export) -> String {
    let completed = export
        .completed_at
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{:<38} {:<20} {:<16} {:<10} {:<40} {:<20}",
        export.id.to_string(),
        export.processor,
        status_label(export.status),
        export.file_total_rows,
        export.filename.as_deref().unwrap_or("-"),
        completed
    )
}
