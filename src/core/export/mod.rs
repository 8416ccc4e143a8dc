//! Export planning, page workers, batch coordination and collation
//!
//! This module provides the core export logic for Quire, including:
//! - Planning a paged export and tracking its record ([`orchestrator`])
//! - Bounded-parallel page workers with retry ([`coordinator`], [`worker`], [`retry`])
//! - The barrier that decides when collation may start ([`batch`])
//! - Reconciliation, merge and publish of chunk files ([`collator`])
//! - Summary and reporting ([`summary`])

pub mod batch;
pub mod collator;
pub mod coordinator;
pub mod orchestrator;
pub mod policy;
pub mod retry;
pub mod summary;
pub mod worker;

pub use batch::{BatchEvent, BatchProgress, BatchRun, UnitOutcome};
pub use collator::{CollateFailure, CollateRequest, Collator, Published};
pub use coordinator::{BatchCoordinator, BatchHandle, WorkUnit};
pub use orchestrator::{ExportDefinition, ExportHandle, ExportOrchestrator};
pub use policy::{ExportPolicy, ReconciliationMode, RetryPolicy};
pub use retry::run_with_retry;
pub use summary::{ExportError, ExportErrorType, ExportReport};
pub use worker::{PageOutcome, PageWorker};
