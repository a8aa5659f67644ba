//! Context preservers: which messages carry forward across a rotation.

use rotor_core::{Message, Result};
use rotor_settings::{FullHistorySettings, SlidingWindowSettings};
use tracing::{debug, warn};

/// Messages selected for the next generation.
#[derive(Clone, Debug, PartialEq)]
pub struct PreservationResult {
    /// Carried-forward messages, in original order.
    pub messages: Vec<Message>,
    /// How many older messages were left behind.
    pub dropped_count: usize,
    /// Advisory flag: the history is at or above the configured warning size.
    pub warning: bool,
}

/// Keeps only the most recent messages.
#[derive(Clone, Debug)]
pub struct SlidingWindowPreserver {
    window: usize,
}

impl SlidingWindowPreserver {
    /// Validate settings and build the preserver.
    pub fn new(settings: &SlidingWindowSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            window: settings.effective_window_size(),
        })
    }

    /// `max(window_size, min_window_size)`.
    pub fn effective_window_size(&self) -> usize {
        self.window
    }

    /// Keep the last `effective_window_size` messages.
    pub fn preserve(&self, messages: &[Message]) -> PreservationResult {
        let (kept, dropped_count) = tail(messages, self.window);
        PreservationResult {
            messages: kept,
            dropped_count,
            warning: false,
        }
    }
}

/// Carries everything forward, optionally under a hard cap.
#[derive(Clone, Debug)]
pub struct FullHistoryPreserver {
    max_messages: Option<usize>,
    warn_threshold: Option<usize>,
}

impl FullHistoryPreserver {
    /// Validate settings and build the preserver.
    pub fn new(settings: &FullHistorySettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            max_messages: settings.max_messages,
            warn_threshold: settings.warn_threshold,
        })
    }

    /// Pass everything through, apply the cap if set, flag large histories.
    pub fn preserve(&self, messages: &[Message]) -> PreservationResult {
        let warning = self
            .warn_threshold
            .is_some_and(|threshold| messages.len() >= threshold);
        if warning {
            warn!(
                message_count = messages.len(),
                warn_threshold = self.warn_threshold,
                "full history is large"
            );
        }

        let (kept, dropped_count) = match self.max_messages {
            Some(cap) => tail(messages, cap),
            None => (messages.to_vec(), 0),
        };
        PreservationResult {
            messages: kept,
            dropped_count,
            warning,
        }
    }
}

/// Closed set of preservers, selected by configuration.
#[derive(Clone, Debug)]
pub enum ContextPreserver {
    /// Keep the tail.
    SlidingWindow(SlidingWindowPreserver),
    /// Keep everything.
    FullHistory(FullHistoryPreserver),
}

impl ContextPreserver {
    /// Registered name of the active variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SlidingWindow(_) => "sliding_window",
            Self::FullHistory(_) => "full_history",
        }
    }

    /// Select the messages that survive the rotation.
    pub fn preserve(&self, messages: &[Message]) -> PreservationResult {
        let result = match self {
            Self::SlidingWindow(p) => p.preserve(messages),
            Self::FullHistory(p) => p.preserve(messages),
        };
        debug!(
            preserver = self.name(),
            kept = result.messages.len(),
            dropped = result.dropped_count,
            "context preserved"
        );
        result
    }
}

fn tail(messages: &[Message], keep: usize) -> (Vec<Message>, usize) {
    let dropped = messages.len().saturating_sub(keep);
    (messages[dropped..].to_vec(), dropped)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rotor_core::RotationError;

    fn history(n: usize) -> Vec<Message> {
        (0..n).map(|i| Message::user(format!("m{i}"))).collect()
    }

    // -- sliding window --

    #[test]
    fn sliding_window_keeps_suffix() {
        let p = SlidingWindowPreserver::new(&SlidingWindowSettings {
            window_size: 5,
            min_window_size: 3,
        })
        .unwrap();
        let result = p.preserve(&history(12));
        assert_eq!(result.messages.len(), 5);
        assert_eq!(result.dropped_count, 7);
        assert_eq!(result.messages[0].content, "m7");
        assert_eq!(result.messages[4].content, "m11");
    }

    #[test]
    fn sliding_window_short_history_unchanged() {
        let p = SlidingWindowPreserver::new(&SlidingWindowSettings::default()).unwrap();
        let msgs = history(10);
        let result = p.preserve(&msgs);
        assert_eq!(result.messages, msgs);
        assert_eq!(result.dropped_count, 0);
    }

    #[test]
    fn min_window_floors_window_size() {
        let p = SlidingWindowPreserver::new(&SlidingWindowSettings {
            window_size: 1,
            min_window_size: 4,
        })
        .unwrap();
        assert_eq!(p.effective_window_size(), 4);
        assert_eq!(p.preserve(&history(6)).dropped_count, 2);
    }

    #[test]
    fn zero_window_rejected() {
        assert_matches!(
            SlidingWindowPreserver::new(&SlidingWindowSettings {
                window_size: 0,
                min_window_size: 3,
            }),
            Err(RotationError::InvalidConfig(_))
        );
    }

    // -- full history --

    #[test]
    fn full_history_passes_through() {
        let p = FullHistoryPreserver::new(&FullHistorySettings::default()).unwrap();
        let msgs = history(20);
        let result = p.preserve(&msgs);
        assert_eq!(result.messages, msgs);
        assert_eq!(result.dropped_count, 0);
        assert!(!result.warning);
    }

    #[test]
    fn warn_threshold_is_advisory() {
        let p = FullHistoryPreserver::new(&FullHistorySettings {
            max_messages: None,
            warn_threshold: Some(5),
        })
        .unwrap();
        let result = p.preserve(&history(5));
        assert!(result.warning);
        assert_eq!(result.messages.len(), 5);
        assert_eq!(result.dropped_count, 0);
    }

    #[test]
    fn hard_cap_keeps_tail() {
        let p = FullHistoryPreserver::new(&FullHistorySettings {
            max_messages: Some(3),
            warn_threshold: None,
        })
        .unwrap();
        let result = p.preserve(&history(8));
        assert_eq!(result.dropped_count, 5);
        assert_eq!(result.messages[0].content, "m5");
        assert!(!result.warning);
    }

    #[test]
    fn enum_dispatch_names() {
        let p = ContextPreserver::FullHistory(
            FullHistoryPreserver::new(&FullHistorySettings::default()).unwrap(),
        );
        assert_eq!(p.name(), "full_history");
        assert_eq!(p.preserve(&history(2)).messages.len(), 2);
    }
}
