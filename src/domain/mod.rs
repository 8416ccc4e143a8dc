//! Domain models and types for Quire.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Identifiers** ([`ExportId`], [`RunId`])
//! - **The export record** ([`Export`]) and its status state machine ([`ExportStatus`])
//! - **Normalized rows** ([`Row`]) handed to row writers
//! - **Error types** ([`QuireError`]) and the [`Result`] alias
//!
//! # Status transitions
//!
//! ```rust
//! use quire::domain::{Export, ExportStatus, RunId};
//!
//! # fn example() -> quire::domain::Result<()> {
//! let mut export = Export::pending("RetailerExport", None, 4001, RunId::new());
//! export.mark_in_progress()?;
//! export.mark_completed("RetailerExport-20250101120000.csv")?;
//! assert_eq!(export.status, ExportStatus::Completed);
//! assert!(export.completed_at.is_some());
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod export;
pub mod ids;
pub mod result;
pub mod row;

// Re-export commonly used types for convenience
pub use errors::QuireError;
pub use export::{Export, ExportStatus, OwnerRef};
pub use ids::{ExportId, RunId};
pub use result::Result;
pub use row::Row;
