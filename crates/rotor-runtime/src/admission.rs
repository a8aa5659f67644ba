//! # Admission Gate
//!
//! Enforces at most one in-flight rotation per session and serializes
//! generation changes.
//!
//! Each session has a slot holding an in-flight flag and the last committed
//! generation. [`AdmissionGate::try_admit`] claims the slot and hands back an
//! [`AdmissionPermit`]; the slot is released when the permit drops.
//! [`AdmissionPermit::commit`] advances the stored generation by exactly one.
//!
//! Every admission decision is reported to [`RotationMetrics`].

use std::sync::Arc;

use dashmap::DashMap;
use rotor_core::{AdmissionRejection, Result, RotationError};
use rotor_telemetry::RotationMetrics;
use tracing::debug;

#[derive(Debug)]
struct Slot {
    in_flight: bool,
    generation: u64,
}

struct GateInner {
    slots: DashMap<String, Slot>,
    metrics: Arc<RotationMetrics>,
}

/// Per-session single-flight gate with generation compare-and-swap.
///
/// Cheap to clone; clones share the same slots.
#[derive(Clone)]
pub struct AdmissionGate {
    inner: Arc<GateInner>,
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("sessions", &self.inner.slots.len())
            .finish_non_exhaustive()
    }
}

impl AdmissionGate {
    /// Create a gate reporting into `metrics`.
    pub fn new(metrics: Arc<RotationMetrics>) -> Self {
        Self {
            inner: Arc::new(GateInner {
                slots: DashMap::new(),
                metrics,
            }),
        }
    }

    /// Claim the rotation slot for `session_id` at `generation`.
    ///
    /// A session seen for the first time adopts the caller's generation.
    pub fn try_admit(&self, session_id: &str, generation: u64) -> Result<AdmissionPermit> {
        let rejection = {
            let mut slot = self
                .inner
                .slots
                .entry(session_id.to_string())
                .or_insert(Slot {
                    in_flight: false,
                    generation,
                });
            if slot.in_flight {
                Some(AdmissionRejection::RotationInProgress)
            } else if slot.generation != generation {
                Some(AdmissionRejection::GenerationMismatch {
                    expected: generation,
                    actual: slot.generation,
                })
            } else {
                slot.in_flight = true;
                None
            }
        };

        match rejection {
            Some(reason) => {
                self.inner
                    .metrics
                    .record_admission_attempt(false, Some(reason.error_type()));
                debug!(session_id, generation, reason = %reason, "rotation not admitted");
                Err(RotationError::Admission(reason))
            }
            None => {
                self.inner.metrics.record_admission_attempt(true, None);
                Ok(AdmissionPermit {
                    inner: Arc::clone(&self.inner),
                    session_id: session_id.to_string(),
                    generation,
                })
            }
        }
    }

    /// Last committed generation for `session_id`, if the gate has seen it.
    pub fn current_generation(&self, session_id: &str) -> Option<u64> {
        self.inner.slots.get(session_id).map(|s| s.generation)
    }

    /// Whether a permit for `session_id` is outstanding.
    pub fn is_in_flight(&self, session_id: &str) -> bool {
        self.inner
            .slots
            .get(session_id)
            .is_some_and(|s| s.in_flight)
    }

    /// Forget an idle session. Returns false if a rotation is in flight.
    pub fn forget(&self, session_id: &str) -> bool {
        self.inner
            .slots
            .remove_if(session_id, |_, slot| !slot.in_flight)
            .is_some()
            || !self.inner.slots.contains_key(session_id)
    }
}

/// Exclusive right to rotate one session. Releases the slot on drop.
pub struct AdmissionPermit {
    inner: Arc<GateInner>,
    session_id: String,
    generation: u64,
}

impl std::fmt::Debug for AdmissionPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionPermit")
            .field("session_id", &self.session_id)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl AdmissionPermit {
    /// Session this permit covers.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Generation the rotation started from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Store `new_generation`, which must be exactly one above the admitted one.
    pub fn commit(self, new_generation: u64) -> Result<()> {
        let Some(expected) = self.generation.checked_add(1) else {
            return Err(RotationError::Internal(format!(
                "generation {} cannot be incremented",
                self.generation
            )));
        };
        if new_generation != expected {
            return Err(RotationError::Admission(
                AdmissionRejection::GenerationMismatch {
                    expected,
                    actual: new_generation,
                },
            ));
        }
        if let Some(mut slot) = self.inner.slots.get_mut(&self.session_id) {
            if slot.generation != self.generation {
                return Err(RotationError::Internal(format!(
                    "generation for {} moved to {} while a rotation from {} was in flight",
                    self.session_id, slot.generation, self.generation
                )));
            }
            slot.generation = new_generation;
        }
        Ok(())
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        if let Some(mut slot) = self.inner.slots.get_mut(&self.session_id) {
            slot.in_flight = false;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
