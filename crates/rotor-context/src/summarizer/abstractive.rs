//! Generator-backed summaries with template and fallback paths.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use rotor_core::{Message, Result, Role, RotationError};
use rotor_settings::AbstractiveSettings;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{GenerationMethod, SUMMARIZATION_METADATA_KEY, SummaryOutcome, TextGenerator};

const SNIPPET_CHARS: usize = 100;

/// Summarizes through an injected [`TextGenerator`].
///
/// Without a generator the summary comes from a deterministic template.
/// Generator failures (including timeouts) fall back to keeping the first,
/// middle, and last messages when `use_fallback` is set, and are returned
/// as errors otherwise.
pub struct AbstractiveSummarizer {
    settings: AbstractiveSettings,
    timeout: Duration,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl std::fmt::Debug for AbstractiveSummarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbstractiveSummarizer")
            .field("settings", &self.settings)
            .field("has_generator", &self.generator.is_some())
            .finish()
    }
}

impl AbstractiveSummarizer {
    /// Validate settings and build the summarizer.
    pub fn new(
        settings: &AbstractiveSettings,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            timeout: settings.timeout()?,
            settings: settings.clone(),
            generator,
        })
    }

    /// Whether a generator is configured.
    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Budget for one generator call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Style instruction followed by the role-tagged transcript.
    pub fn build_prompt(&self, messages: &[Message]) -> String {
        let transcript: Vec<String> = messages
            .iter()
            .map(|m| format!("[{}] {}", m.role.as_str().to_uppercase(), m.content))
            .collect();
        format!(
            "{}\n\nConversation:\n{}\n\nSummary:",
            self.settings.style.instruction(),
            transcript.join("\n")
        )
    }

    /// Summarize `messages`.
    pub async fn summarize(&self, messages: &[Message]) -> Result<SummaryOutcome> {
        let started = Instant::now();
        let count = messages.len();

        let Some(generator) = &self.generator else {
            let messages = if count == 0 {
                Vec::new()
            } else {
                vec![summary_message(template_summary(messages), GenerationMethod::TemplateBased)]
            };
            return Ok(SummaryOutcome::new(
                messages,
                count,
                GenerationMethod::TemplateBased,
                started.elapsed(),
            ));
        };
        if count == 0 {
            return Ok(SummaryOutcome::new(
                Vec::new(),
                0,
                GenerationMethod::LlmAbstractive,
                started.elapsed(),
            ));
        }

        let prompt = self.build_prompt(messages);
        match self.generate(generator.as_ref(), &prompt).await {
            Ok(text) => Ok(SummaryOutcome::new(
                vec![summary_message(text, GenerationMethod::LlmAbstractive)],
                count,
                GenerationMethod::LlmAbstractive,
                started.elapsed(),
            )),
            Err(err) if self.settings.use_fallback => {
                warn!(error = %err, message_count = count, "abstractive summary failed, using extractive fallback");
                Ok(SummaryOutcome::new(
                    first_middle_last(messages),
                    count,
                    GenerationMethod::ExtractiveFallback,
                    started.elapsed(),
                ))
            }
            Err(err) => Err(err),
        }
    }

    async fn generate(&self, generator: &dyn TextGenerator, prompt: &str) -> Result<String> {
        let timeout = self.timeout();
        let call = generator.generate(prompt, self.settings.temperature, timeout);
        let text = match tokio::time::timeout(timeout, call).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(RotationError::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
        };
        let text = text.trim();
        if text.is_empty() {
            return Err(RotationError::Generation("generator returned an empty summary".into()));
        }
        debug!(style = self.settings.style.as_str(), chars = text.len(), "abstractive summary generated");
        Ok(text.to_string())
    }
}

fn summary_message(text: String, method: GenerationMethod) -> Message {
    Message::system(text).with_metadata(SUMMARIZATION_METADATA_KEY, method.as_str())
}

fn template_summary(messages: &[Message]) -> String {
    let by_role = |role: Role| messages.iter().filter(|m| m.role == role).count();
    let mut lines = vec![format!(
        "Summary of {} messages ({} user, {} assistant, {} system).",
        messages.len(),
        by_role(Role::User),
        by_role(Role::Assistant),
        by_role(Role::System)
    )];
    if let Some(first) = messages.first() {
        lines.push(format!("First ({}): {}", first.role, snippet(&first.content)));
    }
    if messages.len() > 1
        && let Some(last) = messages.last()
    {
        lines.push(format!("Last ({}): {}", last.role, snippet(&last.content)));
    }
    lines.join("\n")
}

fn snippet(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= SNIPPET_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(SNIPPET_CHARS).collect();
    format!("{cut}...")
}

fn first_middle_last(messages: &[Message]) -> Vec<Message> {
    if messages.is_empty() {
        return Vec::new();
    }
    let last = messages.len() - 1;
    let picks: BTreeSet<usize> = [0, messages.len() / 2, last].into_iter().collect();
    picks.into_iter().map(|i| messages[i].clone()).collect()
}
