//! Export report
//!
//! This module defines the structures returned to callers when an export run
//! ends, whatever its outcome.

use crate::adapters::store::StoredReference;
use crate::core::export::batch::UnitOutcome;
use crate::core::export::worker::PageOutcome;
use crate::domain::{ExportId, ExportStatus, QuireError, RunId};
use serde::Serialize;
use std::time::Duration;

/// Summary of one export run
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    /// Export record this run updated
    pub export_id: ExportId,

    /// Batch run identifier, absent for exports that had nothing to page
    pub run_id: Option<RunId>,

    /// Export name used for the merged file
    pub name: String,

    /// Row count reported by the source before paging
    pub total_rows: u64,

    /// Number of pages planned
    pub total_pages: u64,

    /// Pages that wrote a chunk file
    pub pages_written: u64,

    /// Pages that came back empty
    pub pages_empty: u64,

    /// Pages that failed permanently
    pub pages_failed: u64,

    /// Pages never run or stopped by cancellation
    pub pages_cancelled: u64,

    /// Data rows in the merged file
    pub rows_merged: u64,

    /// Final status of the export record
    pub status: ExportStatus,

    /// Name of the published file, when the export completed
    pub filename: Option<String>,

    /// Where the artifact was published
    pub stored: Option<StoredReference>,

    /// Wall-clock duration of the run
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,

    /// Errors encountered during the run
    pub errors: Vec<ExportError>,
}

fn serialize_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

impl ExportReport {
    /// Create a report for a run that has not produced outcomes yet
    pub fn new(
        export_id: ExportId,
        run_id: Option<RunId>,
        name: impl Into<String>,
        total_rows: u64,
        total_pages: u64,
    ) -> Self {
        Self {
            export_id,
            run_id,
            name: name.into(),
            total_rows,
            total_pages,
            pages_written: 0,
            pages_empty: 0,
            pages_failed: 0,
            pages_cancelled: 0,
            rows_merged: 0,
            status: ExportStatus::Pending,
            filename: None,
            stored: None,
            duration: Duration::from_secs(0),
            errors: Vec::new(),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add an error
    pub fn add_error(&mut self, error: ExportError) {
        self.errors.push(error);
    }

    /// Tally the final page outcomes of the batch run, keeping the error of
    /// every failed page
    pub fn record_pages<'a, I>(&mut self, outcomes: I)
    where
        I: IntoIterator<Item = &'a (u64, UnitOutcome<PageOutcome>)>,
    {
        for (index, outcome) in outcomes {
            match outcome {
                UnitOutcome::Succeeded(PageOutcome::Written { .. }) => self.pages_written += 1,
                UnitOutcome::Succeeded(PageOutcome::Empty) => self.pages_empty += 1,
                UnitOutcome::Cancelled => self.pages_cancelled += 1,
                UnitOutcome::Failed(error) => {
                    self.pages_failed += 1;
                    self.add_error(
                        ExportError::from_error(ExportErrorType::Page, error)
                            .with_context(format!("page {index}")),
                    );
                }
            }
        }
    }

    /// Whether the export completed
    pub fn is_successful(&self) -> bool {
        self.status == ExportStatus::Completed
    }

    /// Whether the export completed with some pages missing
    pub fn is_partial(&self) -> bool {
        self.is_successful() && self.pages_failed > 0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            export_id = %self.export_id,
            name = %self.name,
            status = %self.status,
            total_rows = self.total_rows,
            total_pages = self.total_pages,
            pages_written = self.pages_written,
            pages_empty = self.pages_empty,
            pages_failed = self.pages_failed,
            pages_cancelled = self.pages_cancelled,
            rows_merged = self.rows_merged,
            filename = self.filename.as_deref().unwrap_or(""),
            duration_secs = self.duration.as_secs(),
            "Export finished"
        );

        if !self.errors.is_empty() {
            tracing::warn!(
                error_count = self.errors.len(),
                "Export finished with errors"
            );
            for error in &self.errors {
                tracing::warn!(
                    error_type = ?error.error_type,
                    message = %error.message,
                    context = error.context.as_deref().unwrap_or(""),
                    "Export error"
                );
            }
        }
    }
}

/// Stage of the pipeline an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportErrorType {
    /// A page worker failed
    Page,
    /// Listing the run's chunk files failed
    Listing,
    /// Chunk count did not match the expected worker count
    Reconciliation,
    /// Merging chunk files failed
    Merge,
    /// Publishing to the artifact store failed
    Publish,
    /// Reading or writing the export record failed
    Repository,
    /// The run was cancelled
    Cancelled,
    /// Unknown error
    Unknown,
}

/// Export error with context
#[derive(Debug, Clone, Serialize)]
pub struct ExportError {
    /// Type of error
    pub error_type: ExportErrorType,

    /// Error message
    pub message: String,

    /// Optional context (e.g., page index)
    pub context: Option<String>,
}

impl ExportError {
    /// Create a new export error
    pub fn new(error_type: ExportErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
            context: None,
        }
    }

    /// Create an export error from a pipeline error, using `stage` unless
    /// the error kind says more
    pub fn from_error(stage: ExportErrorType, error: &QuireError) -> Self {
        let error_type = match error {
            QuireError::Reconciliation { .. } => ExportErrorType::Reconciliation,
            QuireError::Cancelled(_) => ExportErrorType::Cancelled,
            QuireError::Repository(_) | QuireError::InvalidTransition { .. } => {
                ExportErrorType::Repository
            }
            _ => stage,
        };
        Self::new(error_type, error.to_string())
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ExportReport {
        ExportReport::new(ExportId::new(), Some(RunId::new()), "visits", 10, 4)
    }

    #[test]
    fn test_record_pages_tallies_outcomes() {
        let mut report = report();
        let outcomes = vec![
            (0, UnitOutcome::Succeeded(PageOutcome::Written { rows: 3 })),
            (1, UnitOutcome::Succeeded(PageOutcome::Empty)),
            (
                2,
                UnitOutcome::Failed(QuireError::Source("down".to_string())),
            ),
            (3, UnitOutcome::Cancelled),
        ];
        report.record_pages(&outcomes);

        assert_eq!(report.pages_written, 1);
        assert_eq!(report.pages_empty, 1);
        assert_eq!(report.pages_failed, 1);
        assert_eq!(report.pages_cancelled, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].error_type, ExportErrorType::Page);
        assert_eq!(report.errors[0].context.as_deref(), Some("page 2"));
    }

    #[test]
    fn test_partial_requires_completed_status() {
        let mut report = report();
        report.pages_failed = 1;
        assert!(!report.is_partial());

        report.status = ExportStatus::Completed;
        assert!(report.is_successful());
        assert!(report.is_partial());
    }

    #[test]
    fn test_error_type_follows_error_kind() {
        let error = ExportError::from_error(
            ExportErrorType::Merge,
            &QuireError::Reconciliation {
                expected: 3,
                found: 2,
            },
        )
        .with_context("run abc");
        assert_eq!(error.error_type, ExportErrorType::Reconciliation);
        assert_eq!(error.context.as_deref(), Some("run abc"));

        let error = ExportError::from_error(
            ExportErrorType::Publish,
            &QuireError::Storage("full".to_string()),
        );
        assert_eq!(error.error_type, ExportErrorType::Publish);
    }

    #[test]
    fn test_report_serializes_duration_in_millis() {
        let report = report().with_duration(Duration::from_millis(1500));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["duration_ms"], 1500);
        assert_eq!(json["status"], "Pending");
    }
}
