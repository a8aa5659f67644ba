//! Summarizer settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Keywords that make a message more likely to survive extractive selection.
pub const DEFAULT_IMPORTANT_KEYWORDS: &[&str] = &[
    "error",
    "bug",
    "fix",
    "decision",
    "important",
    "todo",
    "must",
    "required",
];

/// Summarizer selection and per-variant settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummarizerSettings {
    /// Registered summarizer name (`extractive`, `abstractive`, `noop`).
    pub kind: String,
    /// Heuristic selection summarizer.
    pub extractive: ExtractiveSettings,
    /// Text-generation summarizer.
    pub abstractive: AbstractiveSettings,
    /// Pass-through summarizer.
    pub noop: NoOpSettings,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            kind: "extractive".to_string(),
            extractive: ExtractiveSettings::default(),
            abstractive: AbstractiveSettings::default(),
            noop: NoOpSettings::default(),
        }
    }
}

impl SummarizerSettings {
    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.extractive.validate()?;
        self.abstractive.validate()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extractive
// ─────────────────────────────────────────────────────────────────────────────

/// Extractive summarizer settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractiveSettings {
    /// Inputs at or below this size pass through; also the selection floor.
    pub min_sentences: usize,
    /// Selection ceiling.
    pub max_sentences: usize,
    /// Fraction of messages to keep before clamping.
    pub target_ratio: f64,
    /// Case-insensitive keywords worth a scoring bonus.
    pub important_keywords: Vec<String>,
}

impl Default for ExtractiveSettings {
    fn default() -> Self {
        Self {
            min_sentences: 3,
            max_sentences: 20,
            target_ratio: 0.3,
            important_keywords: DEFAULT_IMPORTANT_KEYWORDS
                .iter()
                .map(|k| (*k).to_string())
                .collect(),
        }
    }
}

impl ExtractiveSettings {
    /// Bounds must be positive and ordered, ratio within (0, 1].
    pub fn validate(&self) -> Result<()> {
        if self.min_sentences == 0 {
            return Err(SettingsError::invalid("min_sentences must be >= 1"));
        }
        if self.max_sentences < self.min_sentences {
            return Err(SettingsError::invalid(format!(
                "max_sentences ({}) must be >= min_sentences ({})",
                self.max_sentences, self.min_sentences
            )));
        }
        if !(self.target_ratio > 0.0 && self.target_ratio <= 1.0) {
            return Err(SettingsError::invalid(format!(
                "target_ratio must be within (0, 1], got {}",
                self.target_ratio
            )));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Abstractive
// ─────────────────────────────────────────────────────────────────────────────

/// Register of the generated summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStyle {
    /// Short, key points only.
    #[default]
    Concise,
    /// Thorough, keeps nuance.
    Detailed,
    /// Keeps code, identifiers, and technical decisions.
    Technical,
    /// Outcomes and decisions for a non-technical reader.
    Executive,
}

impl SummaryStyle {
    /// Instruction appended to the summarization prompt.
    pub fn instruction(self) -> &'static str {
        match self {
            Self::Concise => "Summarize the conversation concisely, keeping only the key points.",
            Self::Detailed => {
                "Summarize the conversation in detail, preserving important nuance and context."
            }
            Self::Technical => {
                "Summarize the conversation for an engineer, preserving code, identifiers, \
                 file paths, and technical decisions."
            }
            Self::Executive => {
                "Summarize the conversation as an executive brief focused on outcomes, \
                 decisions, and open items."
            }
        }
    }

    /// Wire name of the style.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Concise => "concise",
            Self::Detailed => "detailed",
            Self::Technical => "technical",
            Self::Executive => "executive",
        }
    }
}

/// Abstractive summarizer settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AbstractiveSettings {
    /// Summary register.
    pub style: SummaryStyle,
    /// Sampling temperature passed to the generator.
    pub temperature: f64,
    /// Budget for one generation call.
    pub timeout_seconds: f64,
    /// Downgrade generator failures to an extractive fallback.
    pub use_fallback: bool,
}

impl Default for AbstractiveSettings {
    fn default() -> Self {
        Self {
            style: SummaryStyle::Concise,
            temperature: 0.3,
            timeout_seconds: 30.0,
            use_fallback: true,
        }
    }
}

impl AbstractiveSettings {
    /// Temperature within [0, 2]; timeout positive and finite.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(SettingsError::invalid(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }
        let _ = self.timeout()?;
        Ok(())
    }

    /// `timeout_seconds` as a [`Duration`]; must be positive and representable.
    pub fn timeout(&self) -> Result<Duration> {
        if !(self.timeout_seconds.is_finite() && self.timeout_seconds > 0.0) {
            return Err(SettingsError::invalid(format!(
                "timeout_seconds must be positive, got {}",
                self.timeout_seconds
            )));
        }
        Duration::try_from_secs_f64(self.timeout_seconds).map_err(|e| {
            SettingsError::invalid(format!(
                "timeout_seconds {} is out of range: {e}",
                self.timeout_seconds
            ))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NoOp
// ─────────────────────────────────────────────────────────────────────────────

/// Pass-through summarizer settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoOpSettings {
    /// Tag each message with `summarization = "pass_through"`.
    pub tag_messages: bool,
}

impl Default for NoOpSettings {
    fn default() -> Self {
        Self { tag_messages: true }
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
    fn extractive_defaults() {
        let s = ExtractiveSettings::default();
        assert_eq!(s.min_sentences, 3);
        assert_eq!(s.max_sentences, 20);
        assert!((s.target_ratio - 0.3).abs() < f64::EPSILON);
        assert!(s.important_keywords.iter().any(|k| k == "error"));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn extractive_rejects_inverted_bounds() {
        let s = ExtractiveSettings {
            min_sentences: 10,
            max_sentences: 5,
            ..ExtractiveSettings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn extractive_rejects_bad_ratio() {
        for ratio in [0.0, 1.5, f64::NAN] {
            let s = ExtractiveSettings {
                target_ratio: ratio,
                ..ExtractiveSettings::default()
            };
            assert!(s.validate().is_err(), "ratio {ratio} should be rejected");
        }
    }

    #[test]
    fn abstractive_defaults() {
        let s = AbstractiveSettings::default();
        assert_eq!(s.style, SummaryStyle::Concise);
        assert!((s.temperature - 0.3).abs() < f64::EPSILON);
        assert!((s.timeout_seconds - 30.0).abs() < f64::EPSILON);
        assert!(s.use_fallback);
    }

    #[test]
    fn abstractive_rejects_zero_timeout() {
        let s = AbstractiveSettings {
            timeout_seconds: 0.0,
            ..AbstractiveSettings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn abstractive_rejects_unrepresentable_timeout() {
        let s = AbstractiveSettings {
            timeout_seconds: 1e20,
            ..AbstractiveSettings::default()
        };
        assert!(s.validate().is_err());
        assert!(s.timeout().is_err());

        let ok = AbstractiveSettings {
            timeout_seconds: 1.5,
            ..AbstractiveSettings::default()
        };
        assert_eq!(ok.timeout().unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn style_parses_snake_case() {
        let s: AbstractiveSettings =
            serde_json::from_value(json!({"style": "executive", "useFallback": false})).unwrap();
        assert_eq!(s.style, SummaryStyle::Executive);
        assert!(!s.use_fallback);
        assert!(s.style.instruction().contains("executive"));
    }

    #[test]
    fn noop_tags_by_default() {
        assert!(NoOpSettings::default().tag_messages);
    }
}
