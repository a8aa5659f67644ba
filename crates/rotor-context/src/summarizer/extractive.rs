//! Extractive summarization by heuristic message scoring.

use std::collections::HashMap;
use std::time::Instant;

use regex::Regex;
use rotor_core::{Message, Result, RotationError};
use rotor_settings::ExtractiveSettings;

use super::{GenerationMethod, SummaryOutcome};

const TERM_FREQUENCY_SCALE: f64 = 10.0;
const FIRST_POSITION_BONUS: f64 = 5.0;
const LAST_POSITION_BONUS: f64 = 3.0;
const EARLY_POSITION_BONUS: f64 = 2.0;
const EARLY_POSITION_FRACTION: f64 = 0.2;
const KEYWORD_BONUS: f64 = 3.0;
const SWEET_SPOT_LENGTH_BONUS: f64 = 2.0;
const LONG_LENGTH_BONUS: f64 = 1.0;
const QUESTION_BONUS: f64 = 1.5;
const CODE_BONUS: f64 = 2.0;

/// Keeps the highest-scoring original messages, in chronological order.
///
/// Scores are additive heuristics: term frequency against the whole input,
/// position, configured keywords, length, questions, and code content.
#[derive(Clone, Debug)]
pub struct ExtractiveSummarizer {
    min_sentences: usize,
    max_sentences: usize,
    target_ratio: f64,
    keywords: Vec<String>,
    word_re: Regex,
    code_re: Regex,
}

impl ExtractiveSummarizer {
    /// Validate settings and build the summarizer.
    pub fn new(settings: &ExtractiveSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            min_sentences: settings.min_sentences,
            max_sentences: settings.max_sentences,
            target_ratio: settings.target_ratio,
            keywords: settings
                .important_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            word_re: compile(r"\w+")?,
            code_re: compile(r"```|\b(?:def|class|function)\s+\w+")?,
        })
    }

    /// Select the best messages from `messages`.
    pub fn summarize(&self, messages: &[Message]) -> SummaryOutcome {
        let started = Instant::now();
        let count = messages.len();
        if count <= self.min_sentences {
            return SummaryOutcome::new(
                messages.to_vec(),
                count,
                GenerationMethod::Extractive,
                started.elapsed(),
            );
        }

        let scores = self.score(messages);
        let target = self.target_count(count);

        let mut order: Vec<usize> = (0..count).collect();
        order.sort_by(|a, b| scores[*b].total_cmp(&scores[*a]));
        order.truncate(target);
        order.sort_unstable();

        let selected = order.into_iter().map(|i| messages[i].clone()).collect();
        SummaryOutcome::new(selected, count, GenerationMethod::Extractive, started.elapsed())
    }

    /// `clamp(round(count * target_ratio), min_sentences, max_sentences)`, never above `count`.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn target_count(&self, count: usize) -> usize {
        let raw = (count as f64 * self.target_ratio).round() as usize;
        raw.clamp(self.min_sentences, self.max_sentences).min(count)
    }

    /// Heuristic score of every message, index-aligned with `messages`.
    #[allow(clippy::cast_precision_loss)]
    pub fn score(&self, messages: &[Message]) -> Vec<f64> {
        let lowered: Vec<String> = messages.iter().map(|m| m.content.to_lowercase()).collect();
        let words: Vec<Vec<&str>> = lowered
            .iter()
            .map(|text| self.word_re.find_iter(text).map(|m| m.as_str()).collect())
            .collect();

        let mut frequency: HashMap<&str, usize> = HashMap::new();
        for &word in words.iter().flatten() {
            *frequency.entry(word).or_insert(0) += 1;
        }
        let total_words: usize = words.iter().map(Vec::len).sum();
        let count = messages.len();

        (0..count)
            .map(|i| {
                let mut score = 0.0;

                if total_words > 0 {
                    let tf: usize = words[i].iter().map(|w| frequency[w]).sum();
                    score += tf as f64 / total_words as f64 * TERM_FREQUENCY_SCALE;
                }

                if i == 0 {
                    score += FIRST_POSITION_BONUS;
                } else if i == count - 1 {
                    score += LAST_POSITION_BONUS;
                } else if (i as f64) < count as f64 * EARLY_POSITION_FRACTION {
                    score += EARLY_POSITION_BONUS;
                }

                let text = &lowered[i];
                let hits = self.keywords.iter().filter(|k| text.contains(k.as_str())).count();
                score += hits as f64 * KEYWORD_BONUS;

                let length = words[i].len();
                if (10..=100).contains(&length) {
                    score += SWEET_SPOT_LENGTH_BONUS;
                } else if length > 100 {
                    score += LONG_LENGTH_BONUS;
                }

                if text.contains('?') {
                    score += QUESTION_BONUS;
                }
                if self.code_re.is_match(&messages[i].content) {
                    score += CODE_BONUS;
                }
                score
            })
            .collect()
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| RotationError::Internal(format!("bad pattern {pattern}: {e}")))
}
