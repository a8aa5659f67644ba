//! Summarizers: compact the carried-forward messages.
//!
//! Three variants share one result type, [`SummaryOutcome`]:
//!
//! - [`ExtractiveSummarizer`]: heuristic scoring, keeps the best originals
//! - [`AbstractiveSummarizer`]: asks an injected [`TextGenerator`] for a summary,
//!   with a template path when none is injected and an extractive fallback on failure
//! - [`NoOpSummarizer`]: pass-through
//!
//! Callers tell a fallback success from a hard failure by
//! [`SummaryOutcome::fallback_used`], never by error type.

mod abstractive;
mod extractive;
mod noop;

use std::time::Duration;

use async_trait::async_trait;
use rotor_core::{Message, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use abstractive::AbstractiveSummarizer;
pub use extractive::ExtractiveSummarizer;
pub use noop::NoOpSummarizer;

/// Metadata key stamped on summarizer output.
pub const SUMMARIZATION_METADATA_KEY: &str = "summarization";

// =============================================================================
// Collaborator
// =============================================================================

/// External text-generation service used for abstractive summaries.
///
/// The summarizer bounds every call with its own timeout; `timeout` is passed
/// along so the implementation can size its request accordingly.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt`.
    async fn generate(&self, prompt: &str, temperature: f64, timeout: Duration) -> Result<String>;
}

// =============================================================================
// Outcome
// =============================================================================

/// How a summary was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    /// Heuristic selection of original messages.
    Extractive,
    /// Text generated by the collaborator.
    LlmAbstractive,
    /// Deterministic template, no collaborator configured.
    TemplateBased,
    /// Collaborator failed; first/middle/last originals kept.
    ExtractiveFallback,
    /// Messages returned untouched.
    PassThrough,
}

impl GenerationMethod {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extractive => "extractive",
            Self::LlmAbstractive => "llm_abstractive",
            Self::TemplateBased => "template_based",
            Self::ExtractiveFallback => "extractive_fallback",
            Self::PassThrough => "pass_through",
        }
    }
}

impl std::fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one summarization call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOutcome {
    /// Compacted messages.
    pub messages: Vec<Message>,
    /// Input size.
    pub original_count: usize,
    /// Output size.
    pub summary_count: usize,
    /// `summary_count / original_count`; 1.0 for empty input.
    pub compression_ratio: f64,
    /// How the summary was produced.
    pub method: GenerationMethod,
    /// Whether the collaborator failed and the fallback was used.
    pub fallback_used: bool,
    /// Wall-clock time of the whole call.
    pub generation_time_ms: f64,
}

impl SummaryOutcome {
    pub(crate) fn new(
        messages: Vec<Message>,
        original_count: usize,
        method: GenerationMethod,
        generation_time: Duration,
    ) -> Self {
        let summary_count = messages.len();
        Self {
            messages,
            original_count,
            summary_count,
            compression_ratio: compression_ratio(summary_count, original_count),
            method,
            fallback_used: method == GenerationMethod::ExtractiveFallback,
            generation_time_ms: generation_time.as_secs_f64() * 1000.0,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn compression_ratio(summary_count: usize, original_count: usize) -> f64 {
    if original_count == 0 {
        1.0
    } else {
        summary_count as f64 / original_count as f64
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Closed set of summarizers, selected by configuration.
#[derive(Debug)]
pub enum Summarizer {
    /// Heuristic selection.
    Extractive(ExtractiveSummarizer),
    /// Collaborator-backed generation.
    Abstractive(AbstractiveSummarizer),
    /// Pass-through.
    NoOp(NoOpSummarizer),
}

impl Summarizer {
    /// Registered name of the active variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Extractive(_) => "extractive",
            Self::Abstractive(_) => "abstractive",
            Self::NoOp(_) => "noop",
        }
    }

    /// Compact `messages`.
    pub async fn summarize(&self, messages: &[Message]) -> Result<SummaryOutcome> {
        let outcome = match self {
            Self::Extractive(s) => s.summarize(messages),
            Self::Abstractive(s) => s.summarize(messages).await?,
            Self::NoOp(s) => s.summarize(messages),
        };
        debug!(
            summarizer = self.name(),
            method = %outcome.method,
            original = outcome.original_count,
            summary = outcome.summary_count,
            ratio = outcome.compression_ratio,
            fallback = outcome.fallback_used,
            time_ms = outcome.generation_time_ms,
            "messages summarized"
        );
        Ok(outcome)
    }
}

// =============================================================================
// Tests
// =============================================================================
