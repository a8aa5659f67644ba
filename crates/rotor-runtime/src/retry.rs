//! # Retry
//!
//! Wraps a fallible async operation with configurable backoff.
//!
//! Classification order for a failed attempt:
//! 1. Any `skip_errors` match stops immediately
//! 2. If `on_errors` is non-empty, only matching errors are retried
//! 3. Otherwise every error is retried until attempts run out
//!
//! Patterns are case-insensitive regexes matched against
//! `"{error_type}: {message}"` (see [`ClassifyError`]). The sleep between
//! attempts is the only suspension point and honours a `CancellationToken`:
//! cancellation stops before the next sleep and returns the in-flight error.

use std::future::Future;
use std::time::Duration;

use regex::{Regex, RegexBuilder};
use rotor_core::{ClassifyError, RetryConfig, RotationError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Compiled retry policy.
#[derive(Clone, Debug)]
pub struct RetryHelper {
    config: RetryConfig,
    on_errors: Vec<Regex>,
    skip_errors: Vec<Regex>,
}

impl RetryHelper {
    /// Validate `config` and compile its patterns.
    pub fn new(config: RetryConfig) -> rotor_core::Result<Self> {
        config.validate()?;
        let on_errors = compile_all(&config.on_errors)?;
        let skip_errors = compile_all(&config.skip_errors)?;
        Ok(Self {
            config,
            on_errors,
            skip_errors,
        })
    }

    /// A helper that makes exactly one attempt.
    pub fn single_attempt() -> Self {
        Self {
            config: RetryConfig {
                max_attempts: 1,
                ..RetryConfig::default()
            },
            on_errors: Vec::new(),
            skip_errors: Vec::new(),
        }
    }

    /// The policy this helper was built from.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Whether `err` is eligible for another attempt.
    pub fn should_retry<E: ClassifyError>(&self, err: &E) -> bool {
        let text = err.classification_text();
        if self.skip_errors.iter().any(|re| re.is_match(&text)) {
            return false;
        }
        if self.on_errors.is_empty() {
            return true;
        }
        self.on_errors.iter().any(|re| re.is_match(&text))
    }

    /// Run `op` under the retry policy.
    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        E: ClassifyError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_with_cancel(op, None).await
    }

    /// Run `op` under the retry policy, stopping early on cancellation.
    pub async fn run_with_cancel<T, E, F, Fut>(
        &self,
        mut op: F,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, E>
    where
        E: ClassifyError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1u32;

        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if attempt >= max_attempts {
                warn!(attempt, max_attempts, error = %err, "retries exhausted");
                return Err(err);
            }
            if !self.should_retry(&err) {
                debug!(attempt, error_type = err.error_type(), "error not retryable");
                return Err(err);
            }
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                debug!(attempt, "retry cancelled");
                return Err(err);
            }

            let delay_ms = self.config.delay_for_attempt(attempt);
            metrics::counter!("retry_attempts_total", "error_type" => err.error_type().to_string())
                .increment(1);
            debug!(attempt, max_attempts, delay_ms, error = %err, "retrying after failure");

            let sleep = tokio::time::sleep(Duration::from_millis(delay_ms));
            if let Some(token) = cancel {
                tokio::select! {
                    () = sleep => {}
                    () = token.cancelled() => {
                        debug!(attempt, "retry cancelled during backoff");
                        return Err(err);
                    }
                }
            } else {
                sleep.await;
            }
            attempt += 1;
        }
    }
}

fn compile_all(patterns: &[String]) -> rotor_core::Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|e| RotationError::invalid_config(format!("bad retry pattern {p:?}: {e}")))
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
