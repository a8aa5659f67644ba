//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so partial
//! JSON is accepted and missing fields get their production default.

mod preserver;
mod strategy;
mod summarizer;

pub use preserver::*;
pub use strategy::*;
pub use summarizer::*;

use rotor_core::RetryConfig;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings for the rotation subsystem.
///
/// ```json
/// {
///   "strategy": { "kind": "token_based", "tokenBased": { "userOverrides": { "rotate": 90 } } },
///   "summarizer": { "kind": "abstractive", "abstractive": { "style": "technical" } }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RotorSettings {
    /// Settings schema version.
    pub version: String,
    /// Which strategy decides when to rotate.
    pub strategy: StrategySettings,
    /// Which messages survive a rotation.
    pub preserver: PreserverSettings,
    /// How surviving messages are compacted.
    pub summarizer: SummarizerSettings,
    /// Retry policy for external collaborator calls.
    pub retry: RetryConfig,
    /// Rolling metrics window.
    pub metrics: MetricsSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl Default for RotorSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            strategy: StrategySettings::default(),
            preserver: PreserverSettings::default(),
            summarizer: SummarizerSettings::default(),
            retry: RetryConfig::default(),
            metrics: MetricsSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl RotorSettings {
    /// Validate the whole tree once, before anything is built from it.
    pub fn validate(&self) -> Result<()> {
        self.strategy.validate()?;
        self.preserver.validate()?;
        self.summarizer.validate()?;
        self.retry
            .validate()
            .map_err(|e| SettingsError::invalid(e.to_string()))?;
        self.metrics.validate()
    }
}

/// Rolling metrics window settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsSettings {
    /// Number of rotation records kept for windowed statistics.
    pub window_size: usize,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { window_size: 100 }
    }
}

impl MetricsSettings {
    /// The window must hold at least one record.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(SettingsError::invalid("metrics window_size must be >= 1"));
        }
        Ok(())
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: rotor_core::logging::DEFAULT_LOG_LEVEL.to_string(),
            json: false,
        }
    }
}

impl LoggingSettings {
    /// Install the global subscriber described by these settings.
    ///
    /// `RUST_LOG` still wins over `level`. Later calls are no-ops.
    pub fn init(&self) {
        if self.json {
            rotor_core::logging::init_json_subscriber(&self.level);
        } else {
            rotor_core::logging::init_subscriber(&self.level);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
