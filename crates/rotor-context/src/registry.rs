//! # Component Registry
//!
//! Resolves configured component names to concrete variants. The set of
//! names is fixed at compile time; an unknown name fails fast with
//! [`RotationError::InvalidConfig`].

use std::sync::Arc;

use rotor_core::{Result, RotationError};
use rotor_settings::{PreserverSettings, StrategySettings, SummarizerSettings};

use crate::preserver::{ContextPreserver, FullHistoryPreserver, SlidingWindowPreserver};
use crate::strategy::{
    MessageCountStrategy, RotationStrategy, TimeBasedStrategy, TokenBasedStrategy,
};
use crate::summarizer::{
    AbstractiveSummarizer, ExtractiveSummarizer, NoOpSummarizer, Summarizer, TextGenerator,
};

/// Registered strategy names.
pub const STRATEGY_NAMES: &[&str] = &["token_based", "time_based", "message_count"];
/// Registered preserver names.
pub const PRESERVER_NAMES: &[&str] = &["sliding_window", "full_history"];
/// Registered summarizer names.
pub const SUMMARIZER_NAMES: &[&str] = &["extractive", "abstractive", "noop"];

/// Every strategy name [`build_strategy`] accepts.
pub fn available_strategies() -> &'static [&'static str] {
    STRATEGY_NAMES
}

/// Every preserver name [`build_preserver`] accepts.
pub fn available_preservers() -> &'static [&'static str] {
    PRESERVER_NAMES
}

/// Every summarizer name [`build_summarizer`] accepts.
pub fn available_summarizers() -> &'static [&'static str] {
    SUMMARIZER_NAMES
}

/// Build the strategy named by `settings.kind`.
pub fn build_strategy(settings: &StrategySettings) -> Result<RotationStrategy> {
    match settings.kind.as_str() {
        "token_based" => Ok(RotationStrategy::TokenBased(TokenBasedStrategy::new(
            &settings.token_based,
        )?)),
        "time_based" => Ok(RotationStrategy::TimeBased(TimeBasedStrategy::new(
            &settings.time_based,
        )?)),
        "message_count" => Ok(RotationStrategy::MessageCount(MessageCountStrategy::new(
            &settings.message_count,
        )?)),
        other => Err(unknown("strategy", other, STRATEGY_NAMES)),
    }
}

/// Build the preserver named by `settings.kind`.
pub fn build_preserver(settings: &PreserverSettings) -> Result<ContextPreserver> {
    match settings.kind.as_str() {
        "sliding_window" => Ok(ContextPreserver::SlidingWindow(SlidingWindowPreserver::new(
            &settings.sliding_window,
        )?)),
        "full_history" => Ok(ContextPreserver::FullHistory(FullHistoryPreserver::new(
            &settings.full_history,
        )?)),
        other => Err(unknown("preserver", other, PRESERVER_NAMES)),
    }
}

/// Build the summarizer named by `settings.kind`.
///
/// `generator` is only used by the abstractive summarizer; passing `None`
/// there selects its template path.
pub fn build_summarizer(
    settings: &SummarizerSettings,
    generator: Option<Arc<dyn TextGenerator>>,
) -> Result<Summarizer> {
    match settings.kind.as_str() {
        "extractive" => Ok(Summarizer::Extractive(ExtractiveSummarizer::new(
            &settings.extractive,
        )?)),
        "abstractive" => Ok(Summarizer::Abstractive(AbstractiveSummarizer::new(
            &settings.abstractive,
            generator,
        )?)),
        "noop" => Ok(Summarizer::NoOp(NoOpSummarizer::new(&settings.noop))),
        other => Err(unknown("summarizer", other, SUMMARIZER_NAMES)),
    }
}

fn unknown(component: &str, name: &str, known: &[&str]) -> RotationError {
    RotationError::invalid_config(format!(
        "unknown {component} {name:?}, expected one of: {}",
        known.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults_resolve() {
        assert_eq!(build_strategy(&StrategySettings::default()).unwrap().name(), "token_based");
        assert_eq!(
            build_preserver(&PreserverSettings::default()).unwrap().name(),
            "sliding_window"
        );
        assert_eq!(
            build_summarizer(&SummarizerSettings::default(), None).unwrap().name(),
            "extractive"
        );
    }

    #[test]
    fn every_registered_name_builds() {
        for name in available_strategies() {
            let settings = StrategySettings {
                kind: (*name).to_string(),
                ..StrategySettings::default()
            };
            assert_eq!(build_strategy(&settings).unwrap().name(), *name);
        }
        for name in available_preservers() {
            let settings = PreserverSettings {
                kind: (*name).to_string(),
                ..PreserverSettings::default()
            };
            assert_eq!(build_preserver(&settings).unwrap().name(), *name);
        }
        for name in available_summarizers() {
            let settings = SummarizerSettings {
                kind: (*name).to_string(),
                ..SummarizerSettings::default()
            };
            assert_eq!(build_summarizer(&settings, None).unwrap().name(), *name);
        }
    }

    #[test]
    fn unknown_names_fail_fast() {
        let err = build_strategy(&StrategySettings {
            kind: "vibes".into(),
            ..StrategySettings::default()
        })
        .unwrap_err();
        assert_matches!(&err, RotationError::InvalidConfig(msg) if msg.contains("token_based"));

        assert_matches!(
            build_preserver(&PreserverSettings {
                kind: "everything".into(),
                ..PreserverSettings::default()
            }),
            Err(RotationError::InvalidConfig(_))
        );
        assert_matches!(
            build_summarizer(
                &SummarizerSettings {
                    kind: "magic".into(),
                    ..SummarizerSettings::default()
                },
                None
            ),
            Err(RotationError::InvalidConfig(_))
        );
    }

    #[test]
    fn variant_settings_are_validated() {
        let mut settings = StrategySettings::default();
        settings.token_based.rotate_threshold_pct = 10.0;
        assert_matches!(build_strategy(&settings), Err(RotationError::InvalidConfig(_)));
    }
}
