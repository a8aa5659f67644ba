//! Ordered summarize/rotate threshold pair.

use rotor_core::{Result, RotationError};
use serde::Serialize;

/// Validated `(summarize_pct, rotate_pct)` pair.
///
/// Always satisfies `0 <= summarize_pct < rotate_pct <= 100`; the only way to
/// obtain one is through [`ThresholdSet::new`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdSet {
    summarize_pct: f64,
    rotate_pct: f64,
}

impl ThresholdSet {
    /// Validate and build a threshold pair.
    pub fn new(summarize_pct: f64, rotate_pct: f64) -> Result<Self> {
        for (name, value) in [("summarize_pct", summarize_pct), ("rotate_pct", rotate_pct)] {
            if !(value.is_finite() && (0.0..=100.0).contains(&value)) {
                return Err(RotationError::invalid_config(format!(
                    "{name} must be within [0, 100], got {value}"
                )));
            }
        }
        if summarize_pct >= rotate_pct {
            return Err(RotationError::invalid_config(format!(
                "summarize_pct ({summarize_pct}) must be below rotate_pct ({rotate_pct})"
            )));
        }
        Ok(Self {
            summarize_pct,
            rotate_pct,
        })
    }

    /// Utilization at which compaction starts.
    pub fn summarize_pct(&self) -> f64 {
        self.summarize_pct
    }

    /// Utilization at which the session rotates.
    pub fn rotate_pct(&self) -> f64 {
        self.rotate_pct
    }
}
