//! Settings error types.

use rotor_core::RotationError;
use thiserror::Error;

/// Errors that can occur when loading, parsing, or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the settings file.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A settings value was invalid (e.g., out of range).
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

impl SettingsError {
    /// Shorthand for [`SettingsError::InvalidValue`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }
}

impl From<SettingsError> for RotationError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::InvalidValue(msg) => Self::InvalidConfig(msg),
            other => Self::InvalidConfig(other.to_string()),
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
