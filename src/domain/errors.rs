//! Domain error types
//!
//! This module defines the error hierarchy for Quire. Every variant carries
//! owned context so errors can be cloned into barrier events and reports
//! without exposing third-party types.

use thiserror::Error;

/// Main Quire error type
///
/// This is the primary error type used throughout the export pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QuireError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failures raised by the row source (count or page fetch)
    #[error("Source error: {0}")]
    Source(String),

    /// Row codec errors (reading or writing chunk/merged files)
    #[error("Codec error: {0}")]
    Codec(String),

    /// Durable artifact store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Export repository errors
    #[error("Repository error: {0}")]
    Repository(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// A unit of work exceeded its per-attempt wall-clock budget
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The batch run was cancelled before the unit could finish
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Export status change that the state machine forbids
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Chunk-file count found at collation differs from the expected unit count
    #[error("Reconciliation mismatch: expected {expected} chunk file(s), found {found}")]
    Reconciliation { expected: usize, found: usize },

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl QuireError {
    /// Whether the retry policy may attempt the failed operation again.
    ///
    /// Only I/O-shaped failures qualify. Bad data (`Serialization`,
    /// `Validation`) fails the same way on every attempt, and reconciliation
    /// mismatches are raised deliberately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            QuireError::Source(_)
                | QuireError::Codec(_)
                | QuireError::Storage(_)
                | QuireError::Repository(_)
                | QuireError::Io(_)
                | QuireError::Timeout(_)
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for QuireError {
    fn from(err: std::io::Error) -> Self {
        QuireError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for QuireError {
    fn from(err: serde_json::Error) -> Self {
        QuireError::Serialization(err.to_string())
    }
}

// Conversion from csv::Error
impl From<csv::Error> for QuireError {
    fn from(err: csv::Error) -> Self {
        QuireError::Codec(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for QuireError {
    fn from(err: toml::de::Error) -> Self {
        QuireError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_quire_error_display() {
        let err = QuireError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_reconciliation_display() {
        let err = QuireError::Reconciliation {
            expected: 3,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "Reconciliation mismatch: expected 3 chunk file(s), found 2"
        );
        assert!(!err.is_retryable());
    }

    #[test_case(QuireError::Io("disk".into()), true ; "io is transient")]
    #[test_case(QuireError::Timeout("90s".into()), true ; "timeout is transient")]
    #[test_case(QuireError::Storage("503".into()), true ; "storage is transient")]
    #[test_case(QuireError::Source("conn reset".into()), true ; "source is transient")]
    #[test_case(QuireError::Reconciliation { expected: 2, found: 1 }, false ; "reconciliation is terminal")]
    #[test_case(QuireError::Codec("flush".into()), true ; "codec is transient")]
    #[test_case(QuireError::Validation("bad".into()), false ; "validation is terminal")]
    #[test_case(QuireError::Serialization("line 2".into()), false ; "bad data is terminal")]
    #[test_case(QuireError::Cancelled("run".into()), false ; "cancellation is terminal")]
    fn test_is_retryable(err: QuireError, expected: bool) {
        assert_eq!(err.is_retryable(), expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: QuireError = io_err.into();
        assert!(matches!(err, QuireError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: QuireError = json_err.into();
        assert!(matches!(err, QuireError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: QuireError = toml_err.into();
        assert!(matches!(err, QuireError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_quire_error_implements_std_error() {
        let err = QuireError::Validation("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
