//! # rotor-telemetry
//!
//! In-process observability for session rotation.
//!
//! [`RotationMetrics`] keeps a bounded window of [`RotationRecord`]s plus
//! lifetime totals, computes latency percentiles and rates over the window,
//! and checks them against fixed SLA constants. Breaches surface as
//! [`InvariantViolation`] values, never as errors.
//!
//! Every record and rejection is also forwarded to the `metrics` facade, so a
//! process that installs an exporter gets the same counters for free.

#![deny(unsafe_code)]

pub mod percentile;
pub mod record;
pub mod recorder;
pub mod violations;

pub use percentile::percentile;
pub use record::RotationRecord;
pub use recorder::{AdmissionStats, DEFAULT_WINDOW_SIZE, RotationMetrics, RotationStats};
pub use violations::{
    Invariant, InvariantViolation, SLA_COMPRESSION_RATIO_AVG, SLA_FALLBACK_RATE_PCT,
    SLA_LATENCY_MAX_MS, SLA_LATENCY_P95_MS, SLA_LATENCY_P99_MS, SLA_SUCCESS_RATE_PCT, Severity,
};
