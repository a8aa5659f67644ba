//! Context preserver settings.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Preserver selection and per-variant settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreserverSettings {
    /// Registered preserver name (`sliding_window`, `full_history`).
    pub kind: String,
    /// Keep-the-tail preserver.
    pub sliding_window: SlidingWindowSettings,
    /// Pass-through preserver.
    pub full_history: FullHistorySettings,
}

impl Default for PreserverSettings {
    fn default() -> Self {
        Self {
            kind: "sliding_window".to_string(),
            sliding_window: SlidingWindowSettings::default(),
            full_history: FullHistorySettings::default(),
        }
    }
}

impl PreserverSettings {
    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.sliding_window.validate()?;
        self.full_history.validate()
    }
}

/// Sliding window settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlidingWindowSettings {
    /// Number of most recent messages to keep.
    pub window_size: usize,
    /// Floor applied to `window_size`.
    pub min_window_size: usize,
}

impl Default for SlidingWindowSettings {
    fn default() -> Self {
        Self {
            window_size: 10,
            min_window_size: 3,
        }
    }
}

impl SlidingWindowSettings {
    /// `max(window_size, min_window_size)`.
    pub fn effective_window_size(&self) -> usize {
        self.window_size.max(self.min_window_size)
    }

    /// Both sizes must be positive.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(SettingsError::invalid("window_size must be >= 1"));
        }
        if self.min_window_size == 0 {
            return Err(SettingsError::invalid("min_window_size must be >= 1"));
        }
        Ok(())
    }
}

/// Full history settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FullHistorySettings {
    /// Hard cap; when set, only the most recent `max_messages` survive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_messages: Option<usize>,
    /// Advisory size at which a warning flag is raised. Nothing is dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warn_threshold: Option<usize>,
}

impl Default for FullHistorySettings {
    fn default() -> Self {
        Self {
            max_messages: None,
            warn_threshold: Some(100),
        }
    }
}

impl FullHistorySettings {
    /// Limits, when present, must be positive.
    pub fn validate(&self) -> Result<()> {
        if self.max_messages == Some(0) {
            return Err(SettingsError::invalid("max_messages must be >= 1"));
        }
        if self.warn_threshold == Some(0) {
            return Err(SettingsError::invalid("warn_threshold must be >= 1"));
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
    fn sliding_window_defaults() {
        let s = SlidingWindowSettings::default();
        assert_eq!(s.window_size, 10);
        assert_eq!(s.min_window_size, 3);
        assert_eq!(s.effective_window_size(), 10);
    }

    #[test]
    fn effective_window_respects_floor() {
        let s = SlidingWindowSettings {
            window_size: 1,
            min_window_size: 3,
        };
        assert_eq!(s.effective_window_size(), 3);
    }

    #[test]
    fn zero_sizes_rejected() {
        let s = SlidingWindowSettings {
            window_size: 0,
            min_window_size: 3,
        };
        assert!(s.validate().is_err());
        let f = FullHistorySettings {
            max_messages: Some(0),
            warn_threshold: None,
        };
        assert!(f.validate().is_err());
    }

    #[test]
    fn full_history_defaults_warn_at_100() {
        let f: FullHistorySettings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(f.warn_threshold, Some(100));
        assert_eq!(f.max_messages, None);
    }
}
