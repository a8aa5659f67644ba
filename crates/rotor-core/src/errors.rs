//! Error hierarchy for the rotation subsystem.
//!
//! - [`RotationError`]: every fallible rotation operation returns this
//! - [`AdmissionRejection`]: why the admission gate refused a rotation
//! - [`ClassifyError`]: names an error for retry pattern matching
//!
//! SLA and invariant breaches are never errors; they are recorded as data by
//! the telemetry crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Classification
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can be matched by retry `on_errors` / `skip_errors` patterns.
///
/// Patterns are matched against `"{error_type}: {message}"`.
pub trait ClassifyError: std::fmt::Display {
    /// Short type name, e.g. `"Timeout"`.
    fn error_type(&self) -> &str;

    /// The string retry patterns are matched against.
    fn classification_text(&self) -> String {
        format!("{}: {self}", self.error_type())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AdmissionRejection
// ─────────────────────────────────────────────────────────────────────────────

/// Reason the admission gate refused to start a rotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum AdmissionRejection {
    /// Another rotation for the same session is still running.
    RotationInProgress,
    /// The caller's view of the generation is stale.
    GenerationMismatch {
        /// Generation the caller believed was current.
        expected: u64,
        /// Generation the gate last committed.
        actual: u64,
    },
}

impl AdmissionRejection {
    /// Stable key used in the admission rejection histogram.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::RotationInProgress => "rotation_in_progress",
            Self::GenerationMismatch { .. } => "generation_mismatch",
        }
    }
}

impl std::fmt::Display for AdmissionRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RotationInProgress => write!(f, "rotation already in progress"),
            Self::GenerationMismatch { expected, actual } => {
                write!(f, "generation mismatch: expected {expected}, actual {actual}")
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RotationError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised by strategies, preservers, summarizers, and the orchestrator.
#[derive(Debug, Error)]
pub enum RotationError {
    /// Caller supplied malformed input (bad timestamp, empty sample, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration failed validation at build time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An external call exceeded its time budget.
    #[error("timed out after {timeout_ms}ms")]
    Timeout {
        /// The budget that was exceeded.
        timeout_ms: u64,
    },

    /// The text-generation collaborator failed.
    #[error("text generation failed: {0}")]
    Generation(String),

    /// The admission gate refused the rotation.
    #[error("rotation rejected: {0}")]
    Admission(AdmissionRejection),

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RotationError {
    /// Shorthand for [`RotationError::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Shorthand for [`RotationError::InvalidConfig`].
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether a retry could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Generation(_))
    }
}

impl ClassifyError for RotationError {
    fn error_type(&self) -> &str {
        match self {
            Self::InvalidInput(_) => "InvalidInput",
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::NotFound(_) => "NotFound",
            Self::Timeout { .. } => "Timeout",
            Self::Generation(_) => "Generation",
            Self::Admission(_) => "Admission",
            Self::Cancelled => "Cancelled",
            Self::Internal(_) => "Internal",
        }
    }
}

/// Result alias for rotation operations.
pub type Result<T> = std::result::Result<T, RotationError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_text_prefixes_type() {
        let err = RotationError::NotFound("session s1".into());
        assert_eq!(err.classification_text(), "NotFound: not found: session s1");
    }

    #[test]
    fn timeout_display() {
        let err = RotationError::Timeout { timeout_ms: 30_000 };
        assert_eq!(err.to_string(), "timed out after 30000ms");
        assert!(err.is_transient());
    }

    #[test]
    fn config_errors_are_not_transient() {
        assert!(!RotationError::invalid_config("bad").is_transient());
        assert!(!RotationError::invalid_input("bad").is_transient());
    }

    #[test]
    fn admission_rejection_keys() {
        assert_eq!(
            AdmissionRejection::RotationInProgress.error_type(),
            "rotation_in_progress"
        );
        let mismatch = AdmissionRejection::GenerationMismatch {
            expected: 2,
            actual: 3,
        };
        assert_eq!(mismatch.error_type(), "generation_mismatch");
        assert_eq!(
            RotationError::Admission(mismatch).to_string(),
            "rotation rejected: generation mismatch: expected 2, actual 3"
        );
    }

    #[test]
    fn admission_rejection_serde_tagged() {
        let value = serde_json::to_value(AdmissionRejection::RotationInProgress).unwrap();
        assert_eq!(value["type"], "rotation_in_progress");
    }
}
