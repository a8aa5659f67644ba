//! One rotation attempt, as reported to [`crate::RotationMetrics`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Immutable record of a single rotation attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationRecord {
    /// When the attempt finished.
    pub timestamp: DateTime<Utc>,
    /// Wall-clock duration of the attempt.
    pub latency_ms: f64,
    /// Whether a new generation was produced.
    pub success: bool,
    /// `summary_count / original_count`, within (0, 1] when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    /// Whether the summarizer downgraded to its fallback path.
    pub fallback_used: bool,
    /// Generation before the attempt.
    pub old_generation: u64,
    /// Generation after the attempt.
    pub new_generation: u64,
    /// What caused the attempt (decision action, manual, ...).
    pub trigger: String,
    /// Failure description for unsuccessful attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RotationRecord {
    /// A successful rotation from `old_generation` to `new_generation`.
    pub fn success(old_generation: u64, new_generation: u64, latency_ms: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            latency_ms,
            success: true,
            compression_ratio: None,
            fallback_used: false,
            old_generation,
            new_generation,
            trigger: "manual".to_string(),
            error_message: None,
        }
    }

    /// A failed rotation; the generation is unchanged.
    pub fn failure(generation: u64, latency_ms: f64, error_message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            latency_ms,
            success: false,
            compression_ratio: None,
            fallback_used: false,
            old_generation: generation,
            new_generation: generation,
            trigger: "manual".to_string(),
            error_message: Some(error_message.into()),
        }
    }

    /// Attach a compression ratio. Values outside (0, 1] are dropped.
    #[must_use]
    pub fn with_compression_ratio(mut self, ratio: f64) -> Self {
        if ratio > 0.0 && ratio <= 1.0 {
            self.compression_ratio = Some(ratio);
        } else {
            warn!(ratio, "compression ratio outside (0, 1], not recorded");
            self.compression_ratio = None;
        }
        self
    }

    /// Mark whether the summarizer fell back.
    #[must_use]
    pub fn with_fallback(mut self, fallback_used: bool) -> Self {
        self.fallback_used = fallback_used;
        self
    }

    /// Set the trigger label.
    #[must_use]
    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = trigger.into();
        self
    }
}
