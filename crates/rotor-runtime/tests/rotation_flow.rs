//! End-to-end rotation: settings → orchestrator → session → metrics.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use rotor_context::{GenerationMethod, RotationAction, TextGenerator};
use rotor_core::{AdmissionRejection, Message, Result, RotationError, Session};
use rotor_runtime::RotationOrchestrator;
use rotor_settings::settings_from_value;
use rotor_telemetry::{Invariant, RotationMetrics};
use serde_json::{Value, json};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn build(config: Value, generator: Option<Arc<dyn TextGenerator>>) -> RotationOrchestrator {
    let settings = settings_from_value(config).unwrap();
    RotationOrchestrator::from_settings(&settings, generator, Arc::new(RotationMetrics::default()))
        .unwrap()
}

fn conversation(id: &str, n: usize) -> Session {
    let mut session = Session::new(id, "claude-3-5-sonnet", 200_000);
    session.messages = (0..n)
        .map(|i| {
            if i % 2 == 0 {
                Message::user(format!("question {i} about the deploy pipeline?"))
            } else {
                Message::assistant(format!("answer {i}: the pipeline step ran fine"))
            }
        })
        .collect();
    session
}

fn message_count_config(max: usize) -> Value {
    json!({
        "strategy": { "kind": "message_count", "messageCount": { "maxMessageCount": max } },
        "preserver": { "kind": "sliding_window", "slidingWindow": { "windowSize": 8 } },
        "retry": { "maxAttempts": 1 }
    })
}

/// Fails the first `failures` calls, then answers.
struct FlakyGenerator {
    failures: u32,
    calls: AtomicU32,
}

#[async_trait]
impl TextGenerator for FlakyGenerator {
    async fn generate(&self, _prompt: &str, _temperature: f64, _timeout: Duration) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err(RotationError::Generation(format!("upstream 503 on call {call}")))
        } else {
            Ok("The team debugged the deploy pipeline.".into())
        }
    }
}

/// Blocks until released, signalling once it has started.
struct GatedGenerator {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl TextGenerator for GatedGenerator {
    async fn generate(&self, _prompt: &str, _temperature: f64, _timeout: Duration) -> Result<String> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok("held summary".into())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Flows
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn token_pressure_rotates_with_extractive_defaults() {
    let orch = build(json!({}), None);
    let mut session = conversation("tok", 30);

    session.tokens_used = 100_000;
    let outcome = orch.rotate(&mut session).await.unwrap();
    assert!(!outcome.rotated);
    assert_eq!(outcome.decision.action, RotationAction::Continue);

    session.tokens_used = 190_000;
    let outcome = orch.rotate(&mut session).await.unwrap();
    assert!(outcome.rotated);
    assert_eq!(outcome.decision.action, RotationAction::RotateNow);
    assert_eq!(outcome.preserved_count, 10);
    assert_eq!(outcome.dropped_count, 20);
    assert_eq!(session.generation, 1);
    assert_eq!(session.messages.len(), outcome.summary.unwrap().summary_count);
    assert!(session.messages.len() < 10);

    let stats = orch.metrics().get_stats();
    assert_eq!(stats.window_count, 1);
    assert_eq!(stats.success_rate_pct, 100.0);
    assert_eq!(stats.admission.total_attempts, 1);
}

#[tokio::test]
async fn summarize_threshold_also_rotates() {
    let orch = build(json!({}), None);
    let mut session = conversation("sum", 20);
    session.tokens_used = 130_000;

    let outcome = orch.rotate(&mut session).await.unwrap();
    assert_eq!(outcome.decision.action, RotationAction::SummarizeContext);
    assert!(outcome.rotated);
    assert_eq!(orch.metrics().records()[0].trigger, "summarize_context");
}

#[tokio::test]
async fn independent_sessions_rotate_concurrently() {
    let orch = Arc::new(build(message_count_config(10), None));
    let tasks = (0..6).map(|i| {
        let orch = Arc::clone(&orch);
        async move {
            let mut session = conversation(&format!("s{i}"), 12);
            let outcome = orch.rotate(&mut session).await.unwrap();
            (session, outcome)
        }
    });

    let results = futures::future::join_all(tasks).await;
    for (session, outcome) in &results {
        assert!(outcome.rotated);
        assert_eq!(session.generation, 1);
        assert_eq!(orch.gate().current_generation(&session.id), Some(1));
    }
    let stats = orch.metrics().get_stats();
    assert_eq!(stats.total_successes, 6);
    assert_eq!(stats.admission.total_rejections, 0);
}

#[tokio::test]
async fn second_rotation_of_same_session_is_rejected_while_first_runs() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let generator: Arc<dyn TextGenerator> = Arc::new(GatedGenerator {
        entered: Arc::clone(&entered),
        release: Arc::clone(&release),
    });
    let mut config = message_count_config(10);
    config["summarizer"] = json!({ "kind": "abstractive" });
    let orch = build(config, Some(generator));

    let mut first = conversation("shared", 12);
    let mut second = first.clone();

    let (a, b) = tokio::join!(orch.rotate(&mut first), async {
        entered.notified().await;
        let rejected = orch.rotate(&mut second).await;
        release.notify_one();
        rejected
    });

    let outcome = a.unwrap();
    assert_eq!(outcome.summary.unwrap().method, GenerationMethod::LlmAbstractive);
    assert_matches!(
        b,
        Err(RotationError::Admission(AdmissionRejection::RotationInProgress))
    );
    assert_eq!(first.generation, 1);
    assert_eq!(second.generation, 0);

    let admission = orch.metrics().admission_stats();
    assert_eq!(admission.total_attempts, 2);
    assert_eq!(admission.rejections_by_type["rotation_in_progress"], 1);
    assert_eq!(orch.metrics().get_stats().total_rotations, 1);
}

#[tokio::test]
async fn generator_failure_falls_back_and_counts() {
    let generator: Arc<dyn TextGenerator> = Arc::new(FlakyGenerator {
        failures: u32::MAX,
        calls: AtomicU32::new(0),
    });
    let mut config = message_count_config(10);
    config["summarizer"] = json!({ "kind": "abstractive" });
    let orch = build(config, Some(generator));
    let mut session = conversation("fb", 12);

    let outcome = orch.rotate(&mut session).await.unwrap();
    let summary = outcome.summary.unwrap();
    assert_eq!(summary.method, GenerationMethod::ExtractiveFallback);
    assert_eq!(summary.summary_count, 3);
    assert!(orch.metrics().records()[0].fallback_used);

    let stats = orch.metrics().get_stats();
    assert_eq!(stats.fallback_rate_pct, 100.0);
    let found = orch.metrics().check_invariants();
    assert!(found.iter().any(|v| v.invariant == Invariant::FallbackRate));
}

#[tokio::test(start_paused = true)]
async fn transient_generator_errors_are_retried() {
    let generator = Arc::new(FlakyGenerator {
        failures: 2,
        calls: AtomicU32::new(0),
    });
    let dyn_generator: Arc<dyn TextGenerator> = Arc::clone(&generator) as Arc<dyn TextGenerator>;
    let mut config = message_count_config(10);
    config["summarizer"] = json!({ "kind": "abstractive", "abstractive": { "useFallback": false } });
    config["retry"] = json!({ "maxAttempts": 3, "backoff": "constant", "initialDelayMs": 50 });
    let orch = build(config, Some(dyn_generator));
    let mut session = conversation("retry", 12);

    let outcome = orch.rotate(&mut session).await.unwrap();
    assert_eq!(outcome.summary.unwrap().method, GenerationMethod::LlmAbstractive);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    assert_eq!(session.generation, 1);
    assert_eq!(session.messages.len(), 1);
}

#[tokio::test]
async fn hard_failure_is_recorded_and_session_kept() {
    let generator: Arc<dyn TextGenerator> = Arc::new(FlakyGenerator {
        failures: u32::MAX,
        calls: AtomicU32::new(0),
    });
    let mut config = message_count_config(10);
    config["summarizer"] = json!({ "kind": "abstractive", "abstractive": { "useFallback": false } });
    let orch = build(config, Some(generator));
    let mut session = conversation("hard", 12);
    let before = session.clone();

    let err = orch.rotate(&mut session).await.unwrap_err();
    assert_matches!(err, RotationError::Generation(_));
    assert_eq!(session, before);

    let stats = orch.metrics().get_stats();
    assert_eq!(stats.total_failures, 1);
    assert_eq!(stats.failure_rate_pct, 100.0);
    let found = orch.metrics().check_invariants();
    assert!(found.iter().any(|v| v.invariant == Invariant::SuccessRate));
    assert!(
        !found
            .iter()
            .any(|v| v.invariant == Invariant::GenerationIncrement)
    );

    // The gate is free again, so a healthy retry can proceed.
    assert!(!orch.gate().is_in_flight("hard"));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_retry_backoff() {
    let generator = Arc::new(FlakyGenerator {
        failures: u32::MAX,
        calls: AtomicU32::new(0),
    });
    let dyn_generator: Arc<dyn TextGenerator> = Arc::clone(&generator) as Arc<dyn TextGenerator>;
    let mut config = message_count_config(10);
    config["summarizer"] = json!({ "kind": "abstractive", "abstractive": { "useFallback": false } });
    config["retry"] = json!({ "maxAttempts": 5, "initialDelayMs": 10000, "maxDelayMs": 60000 });
    let orch = build(config, Some(dyn_generator));
    let mut session = conversation("cancel", 12);

    let token = CancellationToken::new();
    let canceller = token.clone();
    let _ = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let result = orch.rotate_with_cancel(&mut session, Some(&token)).await;
    assert_matches!(result, Err(RotationError::Generation(msg)) if msg.contains("call 1"));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.generation, 0);
    assert_eq!(orch.metrics().get_stats().total_failures, 1);
}

#[test]
fn invalid_configuration_is_rejected_up_front() {
    let settings = settings_from_value(json!({ "summarizer": { "kind": "llm-magic" } })).unwrap();
    assert_matches!(
        RotationOrchestrator::from_settings(&settings, None, Arc::new(RotationMetrics::default())),
        Err(RotationError::InvalidConfig(msg)) if msg.contains("abstractive")
    );
}

#[test]
fn crossing_threshold_override_is_rejected_before_any_rotation() {
    let settings = settings_from_value(json!({
        "strategy": { "tokenBased": { "userOverrides": { "rotate": 55 } } }
    }))
    .unwrap();
    assert_matches!(
        RotationOrchestrator::from_settings(&settings, None, Arc::new(RotationMetrics::default())),
        Err(RotationError::InvalidConfig(_))
    );
}

#[test]
fn metrics_window_comes_from_settings() {
    let settings = settings_from_value(json!({ "metrics": { "windowSize": 25 } })).unwrap();
    let orch = RotationOrchestrator::standalone(&settings, None).unwrap();
    assert_eq!(orch.metrics().window_capacity(), 25);
}
