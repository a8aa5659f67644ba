//! # rotor-context
//!
//! Decision and compaction logic for session rotation.
//!
//! - [`strategy`]: *when* to compact or rotate ([`RotationStrategy`])
//! - [`preserver`]: *which* messages carry forward ([`ContextPreserver`])
//! - [`summarizer`]: *how* they are compacted ([`Summarizer`])
//! - [`registry`]: name-keyed construction from settings
//!
//! Every component is built from its typed settings section and validates it
//! once at construction. Nothing here performs I/O except the abstractive
//! summarizer's injected [`TextGenerator`], which always runs under a timeout.

#![deny(unsafe_code)]

pub mod preserver;
pub mod registry;
pub mod strategy;
pub mod summarizer;

pub use preserver::{
    ContextPreserver, FullHistoryPreserver, PreservationResult, SlidingWindowPreserver,
};
pub use registry::{
    available_preservers, available_strategies, available_summarizers, build_preserver,
    build_strategy, build_summarizer,
};
pub use strategy::{
    MessageCountStrategy, ModelFamily, RotationAction, RotationDecision, RotationStrategy,
    ThresholdSet, TimeBasedStrategy, TokenBasedStrategy,
};
pub use summarizer::{
    AbstractiveSummarizer, ExtractiveSummarizer, GenerationMethod, NoOpSummarizer,
    SUMMARIZATION_METADATA_KEY, Summarizer, SummaryOutcome, TextGenerator,
};
