//! Session-age strategy.
//!
//! Age is measured from the session's `created_at`, which the orchestrator
//! resets on every rotation.

use chrono::{DateTime, Utc};
use rotor_core::{Result, RotationError};
use rotor_settings::TimeBasedSettings;
use tracing::debug;

use super::{RotationAction, RotationDecision};

/// Rotates once a session has been alive for a fixed duration.
#[derive(Clone, Debug)]
pub struct TimeBasedStrategy {
    threshold_seconds: f64,
}

impl TimeBasedStrategy {
    /// Validate settings and build the strategy.
    pub fn new(settings: &TimeBasedSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            threshold_seconds: settings.resolved_threshold_seconds(),
        })
    }

    /// Resolved threshold in seconds.
    pub fn threshold_seconds(&self) -> f64 {
        self.threshold_seconds
    }

    /// Evaluate elapsed time since `session_start`. `current_time` defaults to now.
    #[allow(clippy::cast_precision_loss)]
    pub fn evaluate(
        &self,
        session_start: DateTime<Utc>,
        current_time: Option<DateTime<Utc>>,
    ) -> Result<RotationDecision> {
        let current = current_time.unwrap_or_else(Utc::now);
        if current < session_start {
            return Err(RotationError::invalid_input(format!(
                "current time {current} is before session start {session_start}"
            )));
        }

        let elapsed = (current - session_start).num_milliseconds() as f64 / 1000.0;
        let threshold = self.threshold_seconds;
        let utilization = elapsed / threshold * 100.0;
        let due = elapsed >= threshold;

        let (action, verb) = if due {
            (RotationAction::RotateNow, "reached")
        } else {
            (RotationAction::Continue, "below")
        };
        let reason = format!(
            "session age {elapsed:.0}s ({:.2}h) {verb} threshold {threshold:.0}s ({:.2}h)",
            elapsed / 3600.0,
            threshold / 3600.0
        );

        debug!(elapsed_secs = elapsed, threshold_secs = threshold, action = %action, "time strategy evaluated");
        Ok(RotationDecision::new(action, reason, utilization))
    }

    /// Like [`evaluate`](Self::evaluate) with RFC 3339 timestamps.
    pub fn evaluate_rfc3339(
        &self,
        session_start: &str,
        current_time: Option<&str>,
    ) -> Result<RotationDecision> {
        let start = parse_timestamp(session_start)?;
        let current = current_time.map(parse_timestamp).transpose()?;
        self.evaluate(start, current)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RotationError::invalid_input(format!("malformed timestamp {raw:?}: {e}")))
}
