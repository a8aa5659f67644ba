//! Rotation strategies.
//!
//! A strategy is a stateless evaluator that turns current session state into
//! a [`RotationDecision`]. The set of strategies is closed:
//!
//! - [`TokenBasedStrategy`]: context-window utilization with model-adaptive thresholds
//! - [`TimeBasedStrategy`]: session age
//! - [`MessageCountStrategy`]: history length
//!
//! [`RotationStrategy`] dispatches over them and is what the orchestrator holds.

mod count;
mod threshold;
mod time;
mod token;

use chrono::{DateTime, Utc};
use rotor_core::{Result, Session};
use serde::{Deserialize, Serialize};

pub use count::MessageCountStrategy;
pub use threshold::ThresholdSet;
pub use time::TimeBasedStrategy;
pub use token::{ModelFamily, TokenBasedStrategy};

// ─────────────────────────────────────────────────────────────────────────────
// Decision
// ─────────────────────────────────────────────────────────────────────────────

/// What the caller should do with the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RotationAction {
    /// Keep going.
    Continue,
    /// Compact the carried-forward context.
    SummarizeContext,
    /// Start a new generation now.
    RotateNow,
}

impl RotationAction {
    /// Lower-case name, used as the rotation trigger label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::SummarizeContext => "summarize_context",
            Self::RotateNow => "rotate_now",
        }
    }
}

impl std::fmt::Display for RotationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one strategy evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationDecision {
    /// Recommended action.
    pub action: RotationAction,
    /// Human-readable explanation including the numbers that produced it.
    pub reason: String,
    /// Percentage of the strategy's budget consumed.
    pub utilization: f64,
}

impl RotationDecision {
    /// Build a decision.
    pub fn new(action: RotationAction, reason: impl Into<String>, utilization: f64) -> Self {
        Self {
            action,
            reason: reason.into(),
            utilization,
        }
    }

    /// True for [`RotationAction::RotateNow`].
    pub fn should_rotate(&self) -> bool {
        self.action == RotationAction::RotateNow
    }

    /// True for anything other than [`RotationAction::Continue`].
    pub fn requires_compaction(&self) -> bool {
        self.action != RotationAction::Continue
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// Closed set of rotation strategies, selected by configuration.
#[derive(Clone, Debug)]
pub enum RotationStrategy {
    /// Token utilization.
    TokenBased(TokenBasedStrategy),
    /// Session age.
    TimeBased(TimeBasedStrategy),
    /// History length.
    MessageCount(MessageCountStrategy),
}

impl RotationStrategy {
    /// Registered name of the active variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TokenBased(_) => "token_based",
            Self::TimeBased(_) => "time_based",
            Self::MessageCount(_) => "message_count",
        }
    }

    /// Evaluate `session` as of `now`.
    ///
    /// Time-based evaluation measures from `session.created_at`; the other
    /// variants ignore `now`.
    pub fn evaluate(&self, session: &Session, now: DateTime<Utc>) -> Result<RotationDecision> {
        match self {
            Self::TokenBased(s) => {
                s.evaluate(session.tokens_used, session.tokens_budget, &session.model_name)
            }
            Self::TimeBased(s) => s.evaluate(session.created_at, Some(now)),
            Self::MessageCount(s) => Ok(s.evaluate_messages(&session.messages)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
