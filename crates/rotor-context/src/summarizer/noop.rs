//! Pass-through summarizer.

use std::time::Instant;

use rotor_core::Message;
use rotor_settings::NoOpSettings;

use super::{GenerationMethod, SUMMARIZATION_METADATA_KEY, SummaryOutcome};

/// Returns messages untouched, optionally tagged `summarization = "pass_through"`.
#[derive(Clone, Debug)]
pub struct NoOpSummarizer {
    tag_messages: bool,
}

impl NoOpSummarizer {
    /// Build the summarizer.
    pub fn new(settings: &NoOpSettings) -> Self {
        Self {
            tag_messages: settings.tag_messages,
        }
    }

    /// Pass `messages` through.
    pub fn summarize(&self, messages: &[Message]) -> SummaryOutcome {
        let started = Instant::now();
        let method = GenerationMethod::PassThrough;
        let out = messages
            .iter()
            .map(|m| {
                if self.tag_messages {
                    m.clone().with_metadata(SUMMARIZATION_METADATA_KEY, method.as_str())
                } else {
                    m.clone()
                }
            })
            .collect();
        SummaryOutcome::new(out, messages.len(), method, started.elapsed())
    }
}
