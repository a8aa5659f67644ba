//! Message-count strategy.

use rotor_core::{Message, Result};
use rotor_settings::MessageCountSettings;
use tracing::debug;

use super::{RotationAction, RotationDecision};

/// Rotates once the history reaches a fixed length.
#[derive(Clone, Debug)]
pub struct MessageCountStrategy {
    max_message_count: usize,
}

impl MessageCountStrategy {
    /// Validate settings and build the strategy.
    pub fn new(settings: &MessageCountSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            max_message_count: settings.max_message_count,
        })
    }

    /// Configured ceiling.
    pub fn max_message_count(&self) -> usize {
        self.max_message_count
    }

    /// Evaluate an explicit message count.
    #[allow(clippy::cast_precision_loss)]
    pub fn evaluate(&self, message_count: usize) -> RotationDecision {
        let max = self.max_message_count;
        let remaining = max.saturating_sub(message_count);
        let utilization = message_count as f64 / max as f64 * 100.0;

        let (action, verb) = if message_count >= max {
            (RotationAction::RotateNow, "reached")
        } else {
            (RotationAction::Continue, "below")
        };
        let reason = format!("message count {message_count} {verb} max {max} ({remaining} remaining)");

        debug!(message_count, max, remaining, action = %action, "message count strategy evaluated");
        RotationDecision::new(action, reason, utilization)
    }

    /// Evaluate the length of `messages`.
    pub fn evaluate_messages(&self, messages: &[Message]) -> RotationDecision {
        self.evaluate(messages.len())
    }
}
