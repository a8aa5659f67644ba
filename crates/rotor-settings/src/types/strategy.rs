//! Rotation strategy settings.
//!
//! One section per strategy variant plus the `kind` selecting which variant
//! the registry builds.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Default percentage of the token budget that triggers summarization.
pub const DEFAULT_SUMMARIZE_THRESHOLD_PCT: f64 = 60.0;
/// Default percentage of the token budget that triggers rotation.
pub const DEFAULT_ROTATE_THRESHOLD_PCT: f64 = 70.0;
/// Default session age before time-based rotation, in seconds.
pub const DEFAULT_TIME_THRESHOLD_SECONDS: f64 = 3600.0;
/// Default message count before count-based rotation.
pub const DEFAULT_MAX_MESSAGE_COUNT: usize = 50;

/// Strategy selection and per-variant settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrategySettings {
    /// Registered strategy name (`token_based`, `time_based`, `message_count`).
    pub kind: String,
    /// Token utilization strategy.
    pub token_based: TokenBasedSettings,
    /// Session age strategy.
    pub time_based: TimeBasedSettings,
    /// Message count strategy.
    pub message_count: MessageCountSettings,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            kind: "token_based".to_string(),
            token_based: TokenBasedSettings::default(),
            time_based: TimeBasedSettings::default(),
            message_count: MessageCountSettings::default(),
        }
    }
}

impl StrategySettings {
    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.token_based.validate()?;
        self.time_based.validate()?;
        self.message_count.validate()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token based
// ─────────────────────────────────────────────────────────────────────────────

/// Caller-pinned thresholds that beat the model-adaptive table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdOverrides {
    /// Summarize threshold percentage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summarize: Option<f64>,
    /// Rotate threshold percentage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate: Option<f64>,
}

impl ThresholdOverrides {
    /// Whether neither threshold is pinned.
    pub fn is_empty(&self) -> bool {
        self.summarize.is_none() && self.rotate.is_none()
    }
}

/// Token utilization strategy settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenBasedSettings {
    /// Utilization percentage at which context is summarized.
    pub summarize_threshold_pct: f64,
    /// Utilization percentage at which the session rotates.
    pub rotate_threshold_pct: f64,
    /// Use per-model-family thresholds instead of the fixed ones.
    pub model_adaptive: bool,
    /// Explicit thresholds taking precedence over everything else.
    pub user_overrides: ThresholdOverrides,
}

impl Default for TokenBasedSettings {
    fn default() -> Self {
        Self {
            summarize_threshold_pct: DEFAULT_SUMMARIZE_THRESHOLD_PCT,
            rotate_threshold_pct: DEFAULT_ROTATE_THRESHOLD_PCT,
            model_adaptive: true,
            user_overrides: ThresholdOverrides::default(),
        }
    }
}

impl TokenBasedSettings {
    /// Check ranges and ordering of every threshold that is fully known here.
    pub fn validate(&self) -> Result<()> {
        check_pct("summarize_threshold_pct", self.summarize_threshold_pct)?;
        check_pct("rotate_threshold_pct", self.rotate_threshold_pct)?;
        check_order(self.summarize_threshold_pct, self.rotate_threshold_pct)?;

        if let Some(s) = self.user_overrides.summarize {
            check_pct("user_overrides.summarize", s)?;
        }
        if let Some(r) = self.user_overrides.rotate {
            check_pct("user_overrides.rotate", r)?;
        }
        if let (Some(s), Some(r)) = (self.user_overrides.summarize, self.user_overrides.rotate) {
            check_order(s, r)?;
        }
        Ok(())
    }
}

fn check_pct(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::invalid(format!(
            "{name} must be within [0, 100], got {value}"
        )))
    }
}

fn check_order(summarize: f64, rotate: f64) -> Result<()> {
    if summarize < rotate {
        Ok(())
    } else {
        Err(SettingsError::invalid(format!(
            "summarize threshold ({summarize}) must be below rotate threshold ({rotate})"
        )))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Time based
// ─────────────────────────────────────────────────────────────────────────────

/// Session age strategy settings.
///
/// The threshold may be given in seconds, minutes, or hours. The first
/// present unit wins in that order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeBasedSettings {
    /// Threshold in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_seconds: Option<f64>,
    /// Threshold in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_minutes: Option<f64>,
    /// Threshold in hours.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_hours: Option<f64>,
}

impl TimeBasedSettings {
    /// Effective threshold in seconds.
    pub fn resolved_threshold_seconds(&self) -> f64 {
        self.threshold_seconds
            .or_else(|| self.threshold_minutes.map(|m| m * 60.0))
            .or_else(|| self.threshold_hours.map(|h| h * 3600.0))
            .unwrap_or(DEFAULT_TIME_THRESHOLD_SECONDS)
    }

    /// The threshold must be a positive, finite duration.
    pub fn validate(&self) -> Result<()> {
        let secs = self.resolved_threshold_seconds();
        if secs.is_finite() && secs > 0.0 {
            Ok(())
        } else {
            Err(SettingsError::invalid(format!(
                "time threshold must be positive, got {secs}s"
            )))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message count
// ─────────────────────────────────────────────────────────────────────────────

/// Message count strategy settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageCountSettings {
    /// Message count at which the session rotates.
    pub max_message_count: usize,
}

impl Default for MessageCountSettings {
    fn default() -> Self {
        Self {
            max_message_count: DEFAULT_MAX_MESSAGE_COUNT,
        }
    }
}

impl MessageCountSettings {
    /// `max_message_count` must be a positive integer.
    pub fn validate(&self) -> Result<()> {
        if self.max_message_count == 0 {
            return Err(SettingsError::invalid("max_message_count must be >= 1"));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_based_defaults() {
        let s = TokenBasedSettings::default();
        assert!((s.summarize_threshold_pct - 60.0).abs() < f64::EPSILON);
        assert!((s.rotate_threshold_pct - 70.0).abs() < f64::EPSILON);
        assert!(s.model_adaptive);
        assert!(s.user_overrides.is_empty());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn token_based_rejects_inverted_thresholds() {
        let s = TokenBasedSettings {
            summarize_threshold_pct: 80.0,
            rotate_threshold_pct: 80.0,
            ..TokenBasedSettings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn token_based_rejects_out_of_range() {
        let s = TokenBasedSettings {
            rotate_threshold_pct: 120.0,
            ..TokenBasedSettings::default()
        };
        assert!(s.validate().is_err());
        let s = TokenBasedSettings {
            summarize_threshold_pct: -1.0,
            ..TokenBasedSettings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn partial_override_only_checks_range() {
        let s: TokenBasedSettings =
            serde_json::from_value(json!({"userOverrides": {"rotate": 90}})).unwrap();
        assert_eq!(s.user_overrides.rotate, Some(90.0));
        assert!(s.validate().is_ok());

        let s: TokenBasedSettings =
            serde_json::from_value(json!({"userOverrides": {"rotate": 190}})).unwrap();
        assert!(s.validate().is_err());
    }

    #[test]
    fn full_override_checks_order() {
        let s: TokenBasedSettings = serde_json::from_value(json!({
            "userOverrides": {"summarize": 90, "rotate": 50}
        }))
        .unwrap();
        assert!(s.validate().is_err());
    }

    #[test]
    fn time_threshold_precedence() {
        let all = TimeBasedSettings {
            threshold_seconds: Some(30.0),
            threshold_minutes: Some(2.0),
            threshold_hours: Some(1.0),
        };
        assert!((all.resolved_threshold_seconds() - 30.0).abs() < f64::EPSILON);

        let minutes_and_hours = TimeBasedSettings {
            threshold_minutes: Some(2.0),
            threshold_hours: Some(1.0),
            ..TimeBasedSettings::default()
        };
        assert!((minutes_and_hours.resolved_threshold_seconds() - 120.0).abs() < f64::EPSILON);

        let hours = TimeBasedSettings {
            threshold_hours: Some(0.5),
            ..TimeBasedSettings::default()
        };
        assert!((hours.resolved_threshold_seconds() - 1800.0).abs() < f64::EPSILON);

        assert!(
            (TimeBasedSettings::default().resolved_threshold_seconds() - 3600.0).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn time_threshold_must_be_positive() {
        let s = TimeBasedSettings {
            threshold_seconds: Some(0.0),
            ..TimeBasedSettings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn message_count_rejects_zero() {
        assert!(MessageCountSettings::default().validate().is_ok());
        assert!(MessageCountSettings { max_message_count: 0 }.validate().is_err());
    }

    #[test]
    fn strategy_settings_camel_case() {
        let s: StrategySettings = serde_json::from_value(json!({
            "kind": "message_count",
            "messageCount": {"maxMessageCount": 12}
        }))
        .unwrap();
        assert_eq!(s.kind, "message_count");
        assert_eq!(s.message_count.max_message_count, 12);
        assert!(s.token_based.model_adaptive);
    }
}
