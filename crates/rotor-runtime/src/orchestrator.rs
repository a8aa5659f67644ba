//! # Rotation Orchestrator
//!
//! Runs one rotation for a session, strictly in sequence:
//!
//! 1. Evaluate the strategy; `Continue` ends here without touching the session
//! 2. Claim the session's admission slot
//! 3. Select carried-forward messages with the preserver
//! 4. Compact them with the summarizer (under the retry policy)
//! 5. Replace the session's messages and advance its generation by one
//! 6. Commit the new generation to the gate and record the attempt
//!
//! A hard summarization failure records a failed attempt, leaves the session
//! untouched, and returns the error. SLA breaches never fail a rotation.

use std::sync::Arc;

use chrono::Utc;
use rotor_context::{
    ContextPreserver, RotationAction, RotationDecision, RotationStrategy, Summarizer,
    SummaryOutcome, TextGenerator, build_preserver, build_strategy, build_summarizer,
};
use rotor_core::{Result, RotationError, Session};
use rotor_settings::RotorSettings;
use rotor_telemetry::{RotationMetrics, RotationRecord};
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::admission::AdmissionGate;
use crate::retry::RetryHelper;

/// What a call to [`RotationOrchestrator::rotate`] did.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationOutcome {
    /// The strategy decision that drove the call.
    pub decision: RotationDecision,
    /// Whether a new generation was produced.
    pub rotated: bool,
    /// Generation before the call.
    pub old_generation: u64,
    /// Generation after the call.
    pub new_generation: u64,
    /// Messages the preserver carried forward.
    pub preserved_count: usize,
    /// Messages the preserver left behind.
    pub dropped_count: usize,
    /// Summarizer result, when a rotation ran.
    pub summary: Option<SummaryOutcome>,
    /// Wall-clock time of the rotation, 0 when nothing ran.
    pub latency_ms: f64,
}

/// Composes strategy, preserver, and summarizer into a rotation.
#[derive(Debug)]
pub struct RotationOrchestrator {
    strategy: RotationStrategy,
    preserver: ContextPreserver,
    summarizer: Summarizer,
    retry: RetryHelper,
    gate: AdmissionGate,
    metrics: Arc<RotationMetrics>,
}

impl RotationOrchestrator {
    /// Assemble an orchestrator with its own admission gate.
    pub fn new(
        strategy: RotationStrategy,
        preserver: ContextPreserver,
        summarizer: Summarizer,
        retry: RetryHelper,
        metrics: Arc<RotationMetrics>,
    ) -> Self {
        Self {
            strategy,
            preserver,
            summarizer,
            retry,
            gate: AdmissionGate::new(Arc::clone(&metrics)),
            metrics,
        }
    }

    /// Build every component from validated settings.
    pub fn from_settings(
        settings: &RotorSettings,
        generator: Option<Arc<dyn TextGenerator>>,
        metrics: Arc<RotationMetrics>,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self::new(
            build_strategy(&settings.strategy)?,
            build_preserver(&settings.preserver)?,
            build_summarizer(&settings.summarizer, generator)?,
            RetryHelper::new(settings.retry.clone())?,
            metrics,
        ))
    }

    /// Build every component and a private recorder sized by `settings.metrics`.
    pub fn standalone(
        settings: &RotorSettings,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Result<Self> {
        let metrics = Arc::new(RotationMetrics::from_settings(&settings.metrics));
        Self::from_settings(settings, generator, metrics)
    }

    /// Share an existing gate, e.g. between orchestrators serving the same sessions.
    #[must_use]
    pub fn with_gate(mut self, gate: AdmissionGate) -> Self {
        self.gate = gate;
        self
    }

    /// The admission gate in use.
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// The metrics recorder in use.
    pub fn metrics(&self) -> &Arc<RotationMetrics> {
        &self.metrics
    }

    /// Evaluate the strategy without rotating.
    pub fn evaluate(&self, session: &Session) -> Result<RotationDecision> {
        self.strategy.evaluate(session, Utc::now())
    }

    /// Rotate `session` if its strategy says so.
    pub async fn rotate(&self, session: &mut Session) -> Result<RotationOutcome> {
        self.rotate_with_cancel(session, None).await
    }

    /// Like [`rotate`](Self::rotate); `cancel` stops summarization retries.
    ///
    /// A token cancelled before admission yields [`RotationError::Cancelled`].
    ///
    /// `tokens_used` is left for the caller to re-measure against the new
    /// message set.
    #[instrument(skip_all, fields(session_id = %session.id, generation = session.generation))]
    pub async fn rotate_with_cancel(
        &self,
        session: &mut Session,
        cancel: Option<&CancellationToken>,
    ) -> Result<RotationOutcome> {
        let decision = self.evaluate(session)?;
        let old_generation = session.generation;
        if decision.action == RotationAction::Continue {
            return Ok(RotationOutcome {
                decision,
                rotated: false,
                old_generation,
                new_generation: old_generation,
                preserved_count: session.message_count(),
                dropped_count: 0,
                summary: None,
                latency_ms: 0.0,
            });
        }

        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(RotationError::Cancelled);
        }
        let permit = self.gate.try_admit(&session.id, old_generation)?;
        let started = Instant::now();
        let trigger = decision.action.as_str();

        let preserved = self.preserver.preserve(&session.messages);
        let summarizer = &self.summarizer;
        let input = preserved.messages.as_slice();
        let summary = match self
            .retry
            .run_with_cancel(move || summarizer.summarize(input), cancel)
            .await
        {
            Ok(summary) => summary,
            Err(err) => {
                let latency_ms = elapsed_ms(started);
                warn!(error = %err, latency_ms, trigger, "rotation failed");
                self.metrics.record_rotation(
                    RotationRecord::failure(old_generation, latency_ms, err.to_string())
                        .with_trigger(trigger),
                );
                return Err(err);
            }
        };

        let new_generation = next_generation(old_generation)?;
        permit.commit(new_generation)?;
        session.messages.clone_from(&summary.messages);
        session.generation = new_generation;
        session.created_at = Utc::now();

        let latency_ms = elapsed_ms(started);
        self.metrics.record_rotation(
            RotationRecord::success(old_generation, new_generation, latency_ms)
                .with_compression_ratio(summary.compression_ratio)
                .with_fallback(summary.fallback_used)
                .with_trigger(trigger),
        );
        info!(
            new_generation,
            trigger,
            preserved = preserved.messages.len(),
            dropped = preserved.dropped_count,
            summary_count = summary.summary_count,
            method = %summary.method,
            latency_ms,
            "session rotated"
        );

        Ok(RotationOutcome {
            decision,
            rotated: true,
            old_generation,
            new_generation,
            preserved_count: preserved.messages.len(),
            dropped_count: preserved.dropped_count,
            summary: Some(summary),
            latency_ms,
        })
    }
}

fn next_generation(generation: u64) -> Result<u64> {
    generation.checked_add(1).ok_or_else(|| {
        RotationError::Internal(format!("generation {generation} cannot be incremented"))
    })
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use rotor_context::GenerationMethod;
    use rotor_core::{AdmissionRejection, Message};
    use std::time::Duration;

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _: &str, _: f64, _: Duration) -> Result<String> {
            Err(RotationError::Generation("model offline".into()))
        }
    }

    fn settings() -> RotorSettings {
        let mut s = RotorSettings::default();
        s.strategy.kind = "message_count".into();
        s.strategy.message_count.max_message_count = 10;
        s.preserver.sliding_window.window_size = 6;
        s.retry.max_attempts = 1;
        s
    }

    fn orchestrator(settings: &RotorSettings) -> RotationOrchestrator {
        RotationOrchestrator::from_settings(settings, None, Arc::new(RotationMetrics::default()))
            .unwrap()
    }

    fn session_with(n: usize) -> Session {
        let mut s = Session::new("s1", "claude-3-sonnet", 200_000);
        s.messages = (0..n).map(|i| Message::user(format!("message {i}"))).collect();
        s
    }

    #[tokio::test]
    async fn continue_leaves_session_alone() {
        let orch = orchestrator(&settings());
        let mut session = session_with(4);
        let before = session.clone();

        let outcome = orch.rotate(&mut session).await.unwrap();
        assert!(!outcome.rotated);
        assert_eq!(outcome.decision.action, RotationAction::Continue);
        assert_eq!(session, before);
        assert_eq!(orch.metrics().get_stats().total_rotations, 0);
        assert_eq!(orch.metrics().admission_stats().total_attempts, 0);
    }

    #[tokio::test]
    async fn rotation_replaces_messages_and_bumps_generation() {
        let orch = orchestrator(&settings());
        let mut session = session_with(12);

        let outcome = orch.rotate(&mut session).await.unwrap();
        assert!(outcome.rotated);
        assert_eq!(outcome.old_generation, 0);
        assert_eq!(outcome.new_generation, 1);
        assert_eq!(outcome.preserved_count, 6);
        assert_eq!(outcome.dropped_count, 6);
        let summary = outcome.summary.unwrap();
        assert_eq!(summary.method, GenerationMethod::Extractive);
        assert_eq!(session.generation, 1);
        assert_eq!(session.messages, summary.messages);
        assert_eq!(orch.gate().current_generation("s1"), Some(1));

        let stats = orch.metrics().get_stats();
        assert_eq!(stats.total_successes, 1);
        let records = orch.metrics().records();
        assert_eq!(records[0].trigger, "rotate_now");
        assert_eq!(records[0].compression_ratio, Some(summary.compression_ratio));
        assert!(orch.metrics().get_violations().is_empty());
    }

    #[tokio::test]
    async fn consecutive_rotations_advance_one_at_a_time() {
        let orch = orchestrator(&settings());
        let mut session = session_with(12);
        let _ = orch.rotate(&mut session).await.unwrap();

        session.messages.extend((0..10).map(|i| Message::assistant(format!("more {i}"))));
        let outcome = orch.rotate(&mut session).await.unwrap();
        assert_eq!(outcome.old_generation, 1);
        assert_eq!(outcome.new_generation, 2);
        assert_eq!(orch.metrics().get_stats().total_rotations, 2);
    }

    #[tokio::test]
    async fn stale_session_copy_is_rejected() {
        let orch = orchestrator(&settings());
        let mut session = session_with(12);
        let mut stale = session.clone();
        let _ = orch.rotate(&mut session).await.unwrap();

        let result = orch.rotate(&mut stale).await;
        assert_matches!(
            result,
            Err(RotationError::Admission(AdmissionRejection::GenerationMismatch { .. }))
        );
        assert_eq!(stale.generation, 0);
    }

    #[tokio::test]
    async fn fallback_is_a_successful_rotation() {
        let mut s = settings();
        s.summarizer.kind = "abstractive".into();
        let generator: Arc<dyn TextGenerator> = Arc::new(FailingGenerator);
        let orch =
            RotationOrchestrator::from_settings(&s, Some(generator), Arc::new(RotationMetrics::default()))
                .unwrap();
        let mut session = session_with(12);

        let outcome = orch.rotate(&mut session).await.unwrap();
        let summary = outcome.summary.unwrap();
        assert!(summary.fallback_used);
        assert_eq!(session.generation, 1);
        assert_eq!(orch.metrics().get_stats().total_fallbacks, 1);
    }

    #[tokio::test]
    async fn hard_failure_records_and_leaves_session() {
        let mut s = settings();
        s.summarizer.kind = "abstractive".into();
        s.summarizer.abstractive.use_fallback = false;
        let generator: Arc<dyn TextGenerator> = Arc::new(FailingGenerator);
        let orch =
            RotationOrchestrator::from_settings(&s, Some(generator), Arc::new(RotationMetrics::default()))
                .unwrap();
        let mut session = session_with(12);
        let before = session.clone();

        let result = orch.rotate(&mut session).await;
        assert_matches!(result, Err(RotationError::Generation(_)));
        assert_eq!(session, before);
        assert!(!orch.gate().is_in_flight("s1"));

        let records = orch.metrics().records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].success);
        assert_eq!(records[0].old_generation, records[0].new_generation);
        assert!(records[0]
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("model offline")));
    }

    #[tokio::test]
    async fn cancelled_before_admission() {
        let orch = orchestrator(&settings());
        let mut session = session_with(12);
        let token = CancellationToken::new();
        token.cancel();

        let result = orch.rotate_with_cancel(&mut session, Some(&token)).await;
        assert_matches!(result, Err(RotationError::Cancelled));
        assert_eq!(session.generation, 0);
        assert_eq!(orch.metrics().admission_stats().total_attempts, 0);
    }

    #[test]
    fn generation_increment_is_checked() {
        assert_eq!(next_generation(41).unwrap(), 42);
        assert_matches!(next_generation(u64::MAX), Err(RotationError::Internal(_)));
    }

    #[tokio::test]
    async fn exhausted_generation_leaves_session_alone() {
        let orch = orchestrator(&settings());
        let mut session = session_with(12);
        session.generation = u64::MAX;
        let before = session.clone();

        let result = orch.rotate(&mut session).await;
        assert_matches!(result, Err(RotationError::Internal(_)));
        assert_eq!(session, before);
        assert!(!orch.gate().is_in_flight("s1"));
        assert_eq!(orch.gate().current_generation("s1"), Some(u64::MAX));
    }

    #[test]
    fn debug_lists_components() {
        let rendered = format!("{:?}", orchestrator(&settings()));
        assert!(rendered.contains("RotationOrchestrator"));
        assert!(rendered.contains("RotationMetrics"));
    }

    #[test]
    fn standalone_recorder_follows_metrics_settings() {
        let mut s = settings();
        s.metrics.window_size = 7;
        let orch = RotationOrchestrator::standalone(&s, None).unwrap();
        assert_eq!(orch.metrics().window_capacity(), 7);
    }

    #[test]
    fn invalid_settings_fail_at_build() {
        let mut s = settings();
        s.preserver.kind = "nope".into();
        assert_matches!(
            RotationOrchestrator::from_settings(&s, None, Arc::new(RotationMetrics::default())),
            Err(RotationError::InvalidConfig(_))
        );
    }
}
