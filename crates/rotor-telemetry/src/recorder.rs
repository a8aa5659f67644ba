//! Rolling-window rotation recorder.
//!
//! [`RotationMetrics`] keeps the most recent records in a bounded window,
//! lifetime totals, admission counters, and an append-only violation log.
//! Per-record checks (generation step, max latency) run on every
//! [`RotationMetrics::record_rotation`]; windowed SLA checks run on demand
//! through [`RotationMetrics::check_invariants`].

use std::collections::{BTreeMap, VecDeque};

use parking_lot::Mutex;
use rotor_settings::MetricsSettings;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::percentile::percentile;
use crate::record::RotationRecord;
use crate::violations::{
    Invariant, InvariantViolation, SLA_COMPRESSION_RATIO_AVG, SLA_FALLBACK_RATE_PCT,
    SLA_LATENCY_MAX_MS, SLA_LATENCY_P95_MS, SLA_LATENCY_P99_MS, SLA_SUCCESS_RATE_PCT, Severity,
};

/// Default number of records kept in the rolling window.
pub const DEFAULT_WINDOW_SIZE: usize = 100;

/// Cumulative admission-control counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionStats {
    /// Every admission decision reported.
    pub total_attempts: u64,
    /// Decisions that refused the rotation.
    pub total_rejections: u64,
    /// Rejections keyed by error type (`rotation_in_progress`, ...).
    pub rejections_by_type: BTreeMap<String, u64>,
}

impl AdmissionStats {
    /// Rejections as a percentage of attempts (0 when nothing was attempted).
    #[allow(clippy::cast_precision_loss)]
    pub fn rejection_rate_pct(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        self.total_rejections as f64 / self.total_attempts as f64 * 100.0
    }
}

/// Windowed statistics plus lifetime totals.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationStats {
    /// Records currently in the window.
    pub window_count: usize,
    /// Median latency.
    pub latency_p50_ms: f64,
    /// 95th percentile latency.
    pub latency_p95_ms: f64,
    /// 99th percentile latency.
    pub latency_p99_ms: f64,
    /// Fastest rotation in the window.
    pub latency_min_ms: f64,
    /// Slowest rotation in the window.
    pub latency_max_ms: f64,
    /// Mean latency.
    pub latency_avg_ms: f64,
    /// Successful records as a percentage of the window.
    pub success_rate_pct: f64,
    /// Failed records as a percentage of the window.
    pub failure_rate_pct: f64,
    /// Mean compression ratio over records that report one.
    pub compression_ratio_avg: Option<f64>,
    /// Smallest reported compression ratio.
    pub compression_ratio_min: Option<f64>,
    /// Largest reported compression ratio.
    pub compression_ratio_max: Option<f64>,
    /// Fallback records as a percentage of the window.
    pub fallback_rate_pct: f64,
    /// Lifetime rotation attempts.
    pub total_rotations: u64,
    /// Lifetime successes.
    pub total_successes: u64,
    /// Lifetime failures.
    pub total_failures: u64,
    /// Lifetime fallbacks.
    pub total_fallbacks: u64,
    /// Admission-control counters.
    pub admission: AdmissionStats,
}

#[derive(Debug, Default)]
struct Totals {
    rotations: u64,
    successes: u64,
    failures: u64,
    fallbacks: u64,
}

#[derive(Debug)]
struct Window {
    records: VecDeque<RotationRecord>,
    totals: Totals,
}

/// Thread-safe rolling-window recorder and SLA checker for rotations.
///
/// Construct one per process (or per tenant) and share it by `Arc` with every
/// rotation call site and the admission gate. All state lives in memory and
/// is dropped with the instance.
#[derive(Debug)]
pub struct RotationMetrics {
    capacity: usize,
    window: Mutex<Window>,
    admission: Mutex<AdmissionStats>,
    violations: Mutex<Vec<InvariantViolation>>,
}

impl Default for RotationMetrics {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl RotationMetrics {
    /// Create a recorder keeping the last `capacity` records (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            window: Mutex::new(Window {
                records: VecDeque::with_capacity(capacity),
                totals: Totals::default(),
            }),
            admission: Mutex::new(AdmissionStats::default()),
            violations: Mutex::new(Vec::new()),
        }
    }

    /// Create a recorder sized by `settings.window_size`.
    pub fn from_settings(settings: &MetricsSettings) -> Self {
        Self::new(settings.window_size)
    }

    /// Maximum number of records in the window.
    pub fn window_capacity(&self) -> usize {
        self.capacity
    }

    // ─────────────────────────────────────────────────────────────────────
    // Recording
    // ─────────────────────────────────────────────────────────────────────

    /// Append a record, update lifetime totals, and run per-record checks.
    pub fn record_rotation(&self, record: RotationRecord) {
        let incremental = incremental_violations(&record);

        metrics::counter!("rotation_attempts_total", "trigger" => record.trigger.clone())
            .increment(1);
        if !record.success {
            metrics::counter!("rotation_failures_total").increment(1);
        }
        if record.fallback_used {
            metrics::counter!("rotation_fallbacks_total").increment(1);
        }
        debug!(
            old_generation = record.old_generation,
            new_generation = record.new_generation,
            latency_ms = record.latency_ms,
            success = record.success,
            fallback_used = record.fallback_used,
            trigger = %record.trigger,
            "rotation recorded"
        );

        {
            let mut window = self.window.lock();
            window.totals.rotations += 1;
            if record.success {
                window.totals.successes += 1;
            } else {
                window.totals.failures += 1;
            }
            if record.fallback_used {
                window.totals.fallbacks += 1;
            }
            if window.records.len() == self.capacity {
                let _ = window.records.pop_front();
            }
            window.records.push_back(record);
        }

        self.push_violations(&incremental);
    }

    /// Count one admission decision made by the external gate.
    pub fn record_admission_attempt(&self, allowed: bool, error_type: Option<&str>) {
        let mut stats = self.admission.lock();
        stats.total_attempts += 1;
        if !allowed {
            let key = error_type.unwrap_or("unknown");
            stats.total_rejections += 1;
            *stats.rejections_by_type.entry(key.to_string()).or_insert(0) += 1;
            metrics::counter!(
                "rotation_admission_rejections_total",
                "error_type" => key.to_string()
            )
            .increment(1);
            debug!(error_type = key, "rotation admission rejected");
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reading
    // ─────────────────────────────────────────────────────────────────────

    /// Snapshot of the records currently in the window, oldest first.
    pub fn records(&self) -> Vec<RotationRecord> {
        self.window.lock().records.iter().cloned().collect()
    }

    /// Current admission counters.
    pub fn admission_stats(&self) -> AdmissionStats {
        self.admission.lock().clone()
    }

    /// Windowed statistics plus lifetime totals. All zero when the window is empty.
    #[allow(clippy::cast_precision_loss)]
    pub fn get_stats(&self) -> RotationStats {
        let (records, totals) = {
            let window = self.window.lock();
            (
                window.records.iter().cloned().collect::<Vec<_>>(),
                Totals {
                    rotations: window.totals.rotations,
                    successes: window.totals.successes,
                    failures: window.totals.failures,
                    fallbacks: window.totals.fallbacks,
                },
            )
        };

        let mut stats = RotationStats {
            window_count: records.len(),
            total_rotations: totals.rotations,
            total_successes: totals.successes,
            total_failures: totals.failures,
            total_fallbacks: totals.fallbacks,
            admission: self.admission_stats(),
            ..RotationStats::default()
        };
        if records.is_empty() {
            return stats;
        }

        let n = records.len() as f64;
        let latencies: Vec<f64> = records.iter().map(|r| r.latency_ms).collect();
        stats.latency_p50_ms = percentile(&latencies, 50.0).unwrap_or_default();
        stats.latency_p95_ms = percentile(&latencies, 95.0).unwrap_or_default();
        stats.latency_p99_ms = percentile(&latencies, 99.0).unwrap_or_default();
        stats.latency_min_ms = latencies.iter().copied().fold(f64::INFINITY, f64::min);
        stats.latency_max_ms = latencies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        stats.latency_avg_ms = latencies.iter().sum::<f64>() / n;

        let successes = records.iter().filter(|r| r.success).count() as f64;
        stats.success_rate_pct = successes / n * 100.0;
        stats.failure_rate_pct = 100.0 - stats.success_rate_pct;

        let fallbacks = records.iter().filter(|r| r.fallback_used).count() as f64;
        stats.fallback_rate_pct = fallbacks / n * 100.0;

        let ratios: Vec<f64> = records.iter().filter_map(|r| r.compression_ratio).collect();
        if !ratios.is_empty() {
            stats.compression_ratio_avg = Some(ratios.iter().sum::<f64>() / ratios.len() as f64);
            stats.compression_ratio_min = ratios.iter().copied().reduce(f64::min);
            stats.compression_ratio_max = ratios.iter().copied().reduce(f64::max);
        }

        stats
    }

    // ─────────────────────────────────────────────────────────────────────
    // Invariants
    // ─────────────────────────────────────────────────────────────────────

    /// Compare windowed statistics against the SLA constants.
    ///
    /// Found violations are returned and also appended to the accumulated
    /// log. Previously accumulated violations are left untouched.
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let stats = self.get_stats();
        if stats.window_count == 0 {
            return Vec::new();
        }

        let mut found = Vec::new();
        if stats.latency_p95_ms >= SLA_LATENCY_P95_MS {
            found.push(InvariantViolation::new(
                Invariant::LatencyP95Ms,
                SLA_LATENCY_P95_MS,
                stats.latency_p95_ms,
                Severity::Warning,
                format!(
                    "p95 latency {:.1}ms exceeds {SLA_LATENCY_P95_MS}ms",
                    stats.latency_p95_ms
                ),
            ));
        }
        if stats.latency_p99_ms >= SLA_LATENCY_P99_MS {
            found.push(InvariantViolation::new(
                Invariant::LatencyP99Ms,
                SLA_LATENCY_P99_MS,
                stats.latency_p99_ms,
                Severity::Error,
                format!(
                    "p99 latency {:.1}ms exceeds {SLA_LATENCY_P99_MS}ms",
                    stats.latency_p99_ms
                ),
            ));
        }
        if stats.success_rate_pct <= SLA_SUCCESS_RATE_PCT {
            found.push(InvariantViolation::new(
                Invariant::SuccessRate,
                SLA_SUCCESS_RATE_PCT,
                stats.success_rate_pct,
                Severity::Critical,
                format!(
                    "success rate {:.2}% is not above {SLA_SUCCESS_RATE_PCT}%",
                    stats.success_rate_pct
                ),
            ));
        }
        if let Some(avg) = stats.compression_ratio_avg
            && avg <= SLA_COMPRESSION_RATIO_AVG
        {
            found.push(InvariantViolation::new(
                Invariant::CompressionRatioAvg,
                SLA_COMPRESSION_RATIO_AVG,
                avg,
                Severity::Warning,
                format!("average compression ratio {avg:.3} is not above {SLA_COMPRESSION_RATIO_AVG}"),
            ));
        }
        if stats.fallback_rate_pct >= SLA_FALLBACK_RATE_PCT {
            found.push(InvariantViolation::new(
                Invariant::FallbackRate,
                SLA_FALLBACK_RATE_PCT,
                stats.fallback_rate_pct,
                Severity::Warning,
                format!(
                    "fallback rate {:.2}% exceeds {SLA_FALLBACK_RATE_PCT}%",
                    stats.fallback_rate_pct
                ),
            ));
        }

        self.push_violations(&found);
        found
    }

    /// Every violation accumulated since the last clear.
    pub fn get_violations(&self) -> Vec<InvariantViolation> {
        self.violations.lock().clone()
    }

    /// Drop the accumulated violation log.
    pub fn clear_violations(&self) {
        self.violations.lock().clear();
    }

    /// Reset window, lifetime totals, admission counters, and violations.
    pub fn reset(&self) {
        {
            let mut window = self.window.lock();
            window.records.clear();
            window.totals = Totals::default();
        }
        *self.admission.lock() = AdmissionStats::default();
        self.clear_violations();
    }

    fn push_violations(&self, found: &[InvariantViolation]) {
        if found.is_empty() {
            return;
        }
        for v in found {
            metrics::counter!(
                "rotation_invariant_violations_total",
                "invariant" => v.invariant.as_str(),
                "severity" => v.severity.to_string()
            )
            .increment(1);
            match v.severity {
                Severity::Warning => {
                    warn!(invariant = %v.invariant, expected = v.expected, actual = v.actual, "{}", v.message);
                }
                Severity::Error | Severity::Critical => {
                    error!(invariant = %v.invariant, severity = %v.severity, expected = v.expected, actual = v.actual, "{}", v.message);
                }
            }
        }
        self.violations.lock().extend_from_slice(found);
    }
}

/// Checks that run on every record, independent of the window.
#[allow(clippy::cast_precision_loss)]
fn incremental_violations(record: &RotationRecord) -> Vec<InvariantViolation> {
    let mut found = Vec::new();
    let expected = record.old_generation.checked_add(1);
    if record.success && expected != Some(record.new_generation) {
        let expected_value = record.old_generation as f64 + 1.0;
        found.push(InvariantViolation::new(
            Invariant::GenerationIncrement,
            expected_value,
            record.new_generation as f64,
            Severity::Critical,
            format!(
                "generation moved from {} to {}, expected one step",
                record.old_generation, record.new_generation
            ),
        ));
    }
    if record.latency_ms > SLA_LATENCY_MAX_MS {
        found.push(InvariantViolation::new(
            Invariant::LatencyMaxMs,
            SLA_LATENCY_MAX_MS,
            record.latency_ms,
            Severity::Error,
            format!(
                "rotation took {:.1}ms, above the {SLA_LATENCY_MAX_MS}ms ceiling",
                record.latency_ms
            ),
        ));
    }
    found
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
