//! Percentile estimation by linear interpolation between closest ranks.

use rotor_core::{Result, RotationError};

/// Compute the `p`-th percentile (0–100) of `values`.
///
/// The sample is sorted, the fractional rank `(n - 1) * p / 100` is located,
/// and the two neighbouring values are interpolated. `p = 0` yields the
/// minimum and `p = 100` the maximum.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percentile(values: &[f64], p: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(RotationError::invalid_input(
            "cannot compute percentile of an empty sample",
        ));
    }
    if !(0.0..=100.0).contains(&p) {
        return Err(RotationError::invalid_input(format!(
            "percentile must be within [0, 100], got {p}"
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (sorted.len() - 1) as f64 * p / 100.0;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return Ok(sorted[lower]);
    }
    let weight = rank - lower as f64;
    Ok(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
}
