//! SLA invariants and the violations recorded against them.
//!
//! Violations are data, never errors: a rotation that breaches an SLA still
//! completes and its result is still returned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Windowed p95 latency must stay below this many milliseconds.
pub const SLA_LATENCY_P95_MS: f64 = 500.0;
/// Windowed p99 latency must stay below this many milliseconds.
pub const SLA_LATENCY_P99_MS: f64 = 1000.0;
/// Any single rotation slower than this is flagged immediately.
pub const SLA_LATENCY_MAX_MS: f64 = 5000.0;
/// Windowed success rate must stay above this percentage.
pub const SLA_SUCCESS_RATE_PCT: f64 = 99.0;
/// Windowed average compression ratio must stay above this value.
pub const SLA_COMPRESSION_RATIO_AVG: f64 = 0.3;
/// Windowed fallback rate must stay below this percentage.
pub const SLA_FALLBACK_RATE_PCT: f64 = 10.0;

/// How bad a violation is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Degraded but tolerable.
    Warning,
    /// Needs attention.
    Error,
    /// Correctness is at risk.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        })
    }
}

/// Checked invariants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Invariant {
    /// `new_generation == old_generation + 1` on every successful rotation.
    GenerationIncrement,
    /// Single rotation latency ceiling.
    LatencyMaxMs,
    /// Windowed p95 latency.
    LatencyP95Ms,
    /// Windowed p99 latency.
    LatencyP99Ms,
    /// Windowed success rate.
    SuccessRate,
    /// Windowed average compression ratio.
    CompressionRatioAvg,
    /// Windowed fallback rate.
    FallbackRate,
}

impl Invariant {
    /// Upper-case name used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GenerationIncrement => "GENERATION_INCREMENT",
            Self::LatencyMaxMs => "LATENCY_MAX_MS",
            Self::LatencyP95Ms => "LATENCY_P95_MS",
            Self::LatencyP99Ms => "LATENCY_P99_MS",
            Self::SuccessRate => "SUCCESS_RATE",
            Self::CompressionRatioAvg => "COMPRESSION_RATIO_AVG",
            Self::FallbackRate => "FALLBACK_RATE",
        }
    }
}

impl std::fmt::Display for Invariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single observed breach.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvariantViolation {
    /// Which invariant was breached.
    pub invariant: Invariant,
    /// The bound that should have held.
    pub expected: f64,
    /// The observed value.
    pub actual: f64,
    /// How bad it is.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// When it was detected.
    pub timestamp: DateTime<Utc>,
}

impl InvariantViolation {
    /// Create a violation timestamped now.
    pub fn new(
        invariant: Invariant,
        expected: f64,
        actual: f64,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            invariant,
            expected,
            actual,
            severity,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
