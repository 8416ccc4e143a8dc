//! Export record and status state machine
//!
//! An [`Export`] is the durable record of one export run. Status changes
//! only go through the methods on this type, which enforce:
//!
//! ```text
//! Pending ──► InProgress ──► Completed
//!    │            │
//!    │            ├────────► Failed
//!    ├────────────┴────────► Stopping ──► Stopped
//!    ├─► Failed
//!    └─► Completed   (zero-row fast path only)
//! ```
//!
//! `completed_at` is set exactly when the status is terminal and `filename`
//! only once the export is `Completed` through a publish.

use crate::domain::ids::{ExportId, RunId};
use crate::domain::{QuireError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Export status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportStatus {
    /// Created, no page worker has reported yet
    #[serde(rename = "Pending")]
    Pending,
    /// At least one page worker has reached a terminal outcome
    #[serde(rename = "In Progress")]
    InProgress,
    /// Run failed; no artifact was published
    #[serde(rename = "Failed")]
    Failed,
    /// Merged artifact was published
    #[serde(rename = "Completed")]
    Completed,
    /// External stop requested
    #[serde(rename = "Stopping")]
    Stopping,
    /// External stop finished
    #[serde(rename = "Stopped")]
    Stopped,
}

impl ExportStatus {
    /// Human-readable value, identical to the persisted form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Failed => "Failed",
            Self::Completed => "Completed",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
        }
    }

    /// Terminal states accept no further status writes
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: ExportStatus) -> bool {
        use ExportStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Completed)
                | (Pending, Failed)
                | (Pending, Stopping)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (InProgress, Stopping)
                | (Stopping, Stopped)
                | (Stopping, Failed)
        )
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polymorphic reference to the principal that owns an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    /// Owner identifier
    pub id: String,
    /// Owner type (e.g. "user", "service")
    pub kind: String,
}

impl OwnerRef {
    /// Creates a new owner reference
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }
}

/// Durable record of one export run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Export {
    /// Record identity
    pub id: ExportId,

    /// Owning principal, if any
    #[serde(default)]
    pub owner: Option<OwnerRef>,

    /// Published artifact file name, set once `Completed` via publish
    #[serde(default)]
    pub filename: Option<String>,

    /// Current status
    pub status: ExportStatus,

    /// Export definition that produced this record
    pub processor: String,

    /// Row count observed when the run was planned
    pub file_total_rows: u64,

    /// Batch run identifier, absent for zero-row exports
    #[serde(default)]
    pub batch_id: Option<RunId>,

    /// When planning started
    pub started_at: DateTime<Utc>,

    /// Set exactly when the status is terminal
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// Record creation time
    pub created_at: DateTime<Utc>,

    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Export {
    /// Creates a `Pending` export for a run that will dispatch page workers
    pub fn pending(
        processor: impl Into<String>,
        owner: Option<OwnerRef>,
        total_rows: u64,
        run_id: RunId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ExportId::new(),
            owner,
            filename: None,
            status: ExportStatus::Pending,
            processor: processor.into(),
            file_total_rows: total_rows,
            batch_id: Some(run_id),
            started_at: now,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an export that completed immediately because the source had no rows
    pub fn completed_empty(processor: impl Into<String>, owner: Option<OwnerRef>) -> Self {
        let now = Utc::now();
        Self {
            id: ExportId::new(),
            owner,
            filename: None,
            status: ExportStatus::Completed,
            processor: processor.into(),
            file_total_rows: 0,
            batch_id: None,
            started_at: now,
            completed_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether no further status writes are accepted
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Moves `Pending` to `InProgress`.
    ///
    /// Returns `Ok(false)` without touching the record when it is already
    /// in progress or further along.
    pub fn mark_in_progress(&mut self) -> Result<bool> {
        if self.status != ExportStatus::Pending {
            return Ok(false);
        }
        self.transition(ExportStatus::InProgress)?;
        Ok(true)
    }

    /// Records a successful publish
    pub fn mark_completed(&mut self, filename: impl Into<String>) -> Result<()> {
        if self.status != ExportStatus::InProgress {
            return Err(self.invalid(ExportStatus::Completed));
        }
        self.transition(ExportStatus::Completed)?;
        self.filename = Some(filename.into());
        Ok(())
    }

    /// Records a failed run.
    ///
    /// Returns `Ok(false)` when the export had already failed.
    pub fn mark_failed(&mut self) -> Result<bool> {
        if self.status == ExportStatus::Failed {
            return Ok(false);
        }
        self.transition(ExportStatus::Failed)?;
        Ok(true)
    }

    /// Records an external stop request
    pub fn mark_stopping(&mut self) -> Result<()> {
        self.transition(ExportStatus::Stopping)
    }

    /// Records that an external stop finished
    pub fn mark_stopped(&mut self) -> Result<()> {
        self.transition(ExportStatus::Stopped)
    }

    fn transition(&mut self, next: ExportStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(self.invalid(next));
        }
        let now = Utc::now();
        self.status = next;
        self.updated_at = now;
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    fn invalid(&self, next: ExportStatus) -> QuireError {
        QuireError::InvalidTransition {
            from: self.status.to_string(),
            to: next.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Export {
        Export::pending("RetailerExport", None, 4001, RunId::new())
    }

    #[test]
    fn test_pending_export_has_no_completion() {
        let export = pending();
        assert_eq!(export.status, ExportStatus::Pending);
        assert_eq!(export.file_total_rows, 4001);
        assert!(export.completed_at.is_none());
        assert!(export.filename.is_none());
        assert!(export.batch_id.is_some());
    }

    #[test]
    fn test_completed_empty_sets_completed_at() {
        let export = Export::completed_empty("RetailerExport", None);
        assert_eq!(export.status, ExportStatus::Completed);
        assert!(export.completed_at.is_some());
        assert!(export.filename.is_none());
        assert!(export.batch_id.is_none());
    }

    #[test]
    fn test_mark_in_progress_is_idempotent() {
        let mut export = pending();
        assert!(export.mark_in_progress().unwrap());
        assert!(!export.mark_in_progress().unwrap());
        assert_eq!(export.status, ExportStatus::InProgress);
        assert!(export.completed_at.is_none());
    }

    #[test]
    fn test_mark_in_progress_is_noop_on_terminal() {
        let mut export = pending();
        export.mark_failed().unwrap();
        assert!(!export.mark_in_progress().unwrap());
        assert_eq!(export.status, ExportStatus::Failed);
    }

    #[test]
    fn test_mark_completed_sets_filename_and_completed_at() {
        let mut export = pending();
        export.mark_in_progress().unwrap();
        export.mark_completed("RetailerExport-20250101120000.csv").unwrap();

        assert_eq!(export.status, ExportStatus::Completed);
        assert_eq!(
            export.filename.as_deref(),
            Some("RetailerExport-20250101120000.csv")
        );
        assert!(export.completed_at.is_some());
    }

    #[test]
    fn test_mark_completed_requires_in_progress() {
        let mut export = pending();
        let err = export.mark_completed("x.csv").unwrap_err();
        assert!(matches!(err, QuireError::InvalidTransition { .. }));
        assert!(export.filename.is_none());
    }

    #[test]
    fn test_terminal_states_reject_writes() {
        let mut export = pending();
        export.mark_in_progress().unwrap();
        export.mark_completed("x.csv").unwrap();

        assert!(export.mark_failed().is_err());
        assert!(export.mark_stopping().is_err());
        assert_eq!(export.status, ExportStatus::Completed);
    }

    #[test]
    fn test_mark_failed_twice_is_noop() {
        let mut export = pending();
        assert!(export.mark_failed().unwrap());
        let first = export.completed_at;
        assert!(!export.mark_failed().unwrap());
        assert_eq!(export.completed_at, first);
    }

    #[test]
    fn test_stopping_then_stopped() {
        let mut export = pending();
        export.mark_in_progress().unwrap();
        export.mark_stopping().unwrap();
        assert!(export.completed_at.is_none());
        export.mark_stopped().unwrap();
        assert!(export.completed_at.is_some());
        assert!(export.is_terminal());
    }

    #[test]
    fn test_status_serializes_with_display_values() {
        let json = serde_json::to_string(&ExportStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let status: ExportStatus = serde_json::from_str("\"Stopped\"").unwrap();
        assert_eq!(status, ExportStatus::Stopped);
    }

    #[test]
    fn test_export_record_round_trips_through_json() {
        let mut export = pending();
        export.owner = Some(OwnerRef::new("42", "user"));
        let json = serde_json::to_string(&export).unwrap();
        let back: Export = serde_json::from_str(&json).unwrap();
        assert_eq!(back, export);
    }
}
