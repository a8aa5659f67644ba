//! # rotor-runtime
//!
//! Drives session rotation end to end.
//!
//! - [`RotationOrchestrator`]: evaluate, admit, preserve, summarize, commit
//! - [`AdmissionGate`]: one in-flight rotation per session, generation CAS
//! - [`RetryHelper`]: backoff around the summarization step, cancellable via
//!   `tokio_util::sync::CancellationToken`
//!
//! Every attempt that passes admission lands in a shared
//! [`rotor_telemetry::RotationMetrics`].

#![deny(unsafe_code)]

pub mod admission;
pub mod orchestrator;
pub mod retry;

pub use admission::{AdmissionGate, AdmissionPermit};
pub use orchestrator::{RotationOrchestrator, RotationOutcome};
pub use retry::RetryHelper;
