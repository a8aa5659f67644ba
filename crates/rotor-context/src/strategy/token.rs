//! Token-utilization strategy with a model-adaptive threshold table.

use rotor_core::{Result, RotationError};
use rotor_settings::{ThresholdOverrides, TokenBasedSettings};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{RotationAction, RotationDecision, ThresholdSet};

/// Model families with tuned thresholds.
///
/// Models that keep long contexts coherent get later thresholds; smaller
/// models compact earlier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Claude Opus.
    Opus,
    /// Claude Sonnet. Also the fallback for unknown models.
    #[default]
    Sonnet,
    /// Claude Haiku.
    Haiku,
    /// GPT-4 family.
    Gpt4,
    /// GPT-3.5 family.
    Gpt35,
    /// Code Llama.
    CodeLlama,
}

impl ModelFamily {
    /// Every family in the table.
    pub const ALL: [Self; 6] = [
        Self::Opus,
        Self::Sonnet,
        Self::Haiku,
        Self::Gpt4,
        Self::Gpt35,
        Self::CodeLlama,
    ];

    /// Detect the family by case-insensitive substring match.
    pub fn detect(model_name: &str) -> Self {
        let name = model_name.to_lowercase();
        if name.contains("opus") {
            Self::Opus
        } else if name.contains("sonnet") {
            Self::Sonnet
        } else if name.contains("haiku") {
            Self::Haiku
        } else if name.contains("gpt-4") || name.contains("gpt4") {
            Self::Gpt4
        } else if name.contains("gpt-3.5") || name.contains("gpt3") {
            Self::Gpt35
        } else if name.contains("codellama") {
            Self::CodeLlama
        } else {
            Self::default()
        }
    }

    /// `(summarize_pct, rotate_pct)` tuned for this family.
    pub fn thresholds(self) -> (f64, f64) {
        match self {
            Self::Opus => (75.0, 85.0),
            Self::Sonnet => (60.0, 70.0),
            Self::Haiku => (50.0, 65.0),
            Self::Gpt4 => (65.0, 75.0),
            Self::Gpt35 => (55.0, 65.0),
            Self::CodeLlama => (50.0, 60.0),
        }
    }

    /// Lower-case family name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opus => "opus",
            Self::Sonnet => "sonnet",
            Self::Haiku => "haiku",
            Self::Gpt4 => "gpt-4",
            Self::Gpt35 => "gpt-3.5",
            Self::CodeLlama => "codellama",
        }
    }
}

/// Rotates on context-window utilization.
///
/// Thresholds resolve per evaluation with precedence user overrides, then
/// the model-adaptive table (when enabled), then the configured defaults.
#[derive(Clone, Debug)]
pub struct TokenBasedStrategy {
    defaults: ThresholdSet,
    model_adaptive: bool,
    overrides: ThresholdOverrides,
}

impl TokenBasedStrategy {
    /// Validate settings and build the strategy.
    ///
    /// Partial overrides are checked against every threshold pair they can
    /// meet: each model family when adaptive, the configured pair otherwise.
    pub fn new(settings: &TokenBasedSettings) -> Result<Self> {
        settings.validate()?;
        let strategy = Self {
            defaults: ThresholdSet::new(
                settings.summarize_threshold_pct,
                settings.rotate_threshold_pct,
            )?,
            model_adaptive: settings.model_adaptive,
            overrides: settings.user_overrides.clone(),
        };
        if strategy.model_adaptive {
            for family in ModelFamily::ALL {
                let _ = strategy.apply_overrides(family.thresholds()).map_err(|e| {
                    RotationError::invalid_config(format!(
                        "user overrides conflict with {} thresholds: {e}",
                        family.as_str()
                    ))
                })?;
            }
        } else {
            let _ = strategy.apply_overrides((
                strategy.defaults.summarize_pct(),
                strategy.defaults.rotate_pct(),
            ))?;
        }
        Ok(strategy)
    }

    /// Thresholds that apply to `model_name`.
    pub fn resolve_thresholds(&self, model_name: &str) -> Result<ThresholdSet> {
        let base = if self.model_adaptive {
            ModelFamily::detect(model_name).thresholds()
        } else {
            (self.defaults.summarize_pct(), self.defaults.rotate_pct())
        };
        self.apply_overrides(base)
    }

    fn apply_overrides(&self, (summarize, rotate): (f64, f64)) -> Result<ThresholdSet> {
        ThresholdSet::new(
            self.overrides.summarize.unwrap_or(summarize),
            self.overrides.rotate.unwrap_or(rotate),
        )
    }

    /// Evaluate raw token counts.
    #[allow(clippy::cast_precision_loss)]
    pub fn evaluate(
        &self,
        tokens_used: u64,
        tokens_budget: u64,
        model_name: &str,
    ) -> Result<RotationDecision> {
        let utilization = if tokens_budget == 0 {
            0.0
        } else {
            tokens_used as f64 * 100.0 / tokens_budget as f64
        };
        let thresholds = self.resolve_thresholds(model_name)?;

        let (action, reason) = if utilization >= thresholds.rotate_pct() {
            (
                RotationAction::RotateNow,
                format!(
                    "context utilization {utilization:.1}% reached rotate threshold {:.1}%",
                    thresholds.rotate_pct()
                ),
            )
        } else if utilization >= thresholds.summarize_pct() {
            (
                RotationAction::SummarizeContext,
                format!(
                    "context utilization {utilization:.1}% reached summarize threshold {:.1}%",
                    thresholds.summarize_pct()
                ),
            )
        } else {
            (
                RotationAction::Continue,
                format!(
                    "context utilization {utilization:.1}% below summarize threshold {:.1}%",
                    thresholds.summarize_pct()
                ),
            )
        };

        debug!(
            tokens_used,
            tokens_budget,
            model = model_name,
            utilization,
            summarize_pct = thresholds.summarize_pct(),
            rotate_pct = thresholds.rotate_pct(),
            action = %action,
            "token strategy evaluated"
        );
        Ok(RotationDecision::new(action, reason, utilization))
    }
}
