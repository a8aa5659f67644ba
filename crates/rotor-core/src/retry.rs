//! Retry configuration and backoff calculation.
//!
//! Provides the portable, sync-only building blocks for retry logic. The
//! async executor lives in `rotor-runtime`, which owns the tokio timer:
//!
//! - [`RetryConfig`]: attempts, backoff shape, error patterns
//! - [`BackoffStrategy`]: exponential, linear, or constant delays
//! - [`calculate_delay_ms`]: delay before the next attempt

use serde::{Deserialize, Serialize};

use crate::errors::{Result, RotationError};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Default number of attempts (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Upper bound accepted for `max_attempts`.
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;
/// Default delay before the first retry in milliseconds.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;
/// Default maximum delay between attempts in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;
/// Default exponential growth factor.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// Shape of the delay curve between attempts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// `initial * factor^(attempt - 1)`.
    #[default]
    Exponential,
    /// `initial * attempt`.
    Linear,
    /// `initial` every time.
    Constant,
}

/// Configuration for retry logic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Total attempts including the first, 1–10 (default: 3).
    pub max_attempts: u32,
    /// Delay curve (default: exponential).
    pub backoff: BackoffStrategy,
    /// Base delay in ms (default: 1000).
    pub initial_delay_ms: u64,
    /// Delay cap in ms (default: 60000).
    pub max_delay_ms: u64,
    /// Growth factor for exponential backoff (default: 2.0).
    pub backoff_factor: f64,
    /// Only errors matching one of these patterns are retried, when non-empty.
    pub on_errors: Vec<String>,
    /// Errors matching any of these patterns are never retried.
    pub skip_errors: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffStrategy::Exponential,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            on_errors: Vec::new(),
            skip_errors: Vec::new(),
        }
    }
}

impl RetryConfig {
    /// Check numeric ranges. Pattern syntax is checked where patterns compile.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_ATTEMPTS_LIMIT).contains(&self.max_attempts) {
            return Err(RotationError::invalid_config(format!(
                "max_attempts must be between 1 and {MAX_ATTEMPTS_LIMIT}, got {}",
                self.max_attempts
            )));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(RotationError::invalid_config(format!(
                "max_delay_ms ({}) must be >= initial_delay_ms ({})",
                self.max_delay_ms, self.initial_delay_ms
            )));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(RotationError::invalid_config(format!(
                "backoff_factor must be a finite number >= 1.0, got {}",
                self.backoff_factor
            )));
        }
        Ok(())
    }

    /// Delay to wait after the given 1-based failed attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        calculate_delay_ms(
            self.backoff,
            attempt,
            self.initial_delay_ms,
            self.max_delay_ms,
            self.backoff_factor,
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backoff calculation
// ─────────────────────────────────────────────────────────────────────────────

/// Calculate the delay after a failed attempt.
///
/// `attempt` is 1-based (1 = the first attempt just failed). The result is
/// always capped at `max_delay_ms`.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn calculate_delay_ms(
    backoff: BackoffStrategy,
    attempt: u32,
    initial_delay_ms: u64,
    max_delay_ms: u64,
    backoff_factor: f64,
) -> u64 {
    let attempt = attempt.max(1);
    let raw = match backoff {
        BackoffStrategy::Exponential => {
            let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
            initial_delay_ms as f64 * backoff_factor.powi(exponent)
        }
        BackoffStrategy::Linear => initial_delay_ms as f64 * f64::from(attempt),
        BackoffStrategy::Constant => initial_delay_ms as f64,
    };

    if !raw.is_finite() || raw >= max_delay_ms as f64 {
        return max_delay_ms;
    }
    raw.round().max(0.0) as u64
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
