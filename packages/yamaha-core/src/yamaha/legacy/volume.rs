//! Percentile ↔ raw decibel conversion for legacy receivers.
//!
//! The device takes tenths of a dB in 0.5 dB steps between -80.5 dB and
//! +16.5 dB. Raw value = 970 × pct/100 − 805, snapped to the nearest step.

use crate::protocol_constants::{LEGACY_VOLUME_OFFSET, LEGACY_VOLUME_SPAN, LEGACY_VOLUME_STEP};

/// Converts a 0..100 percentile to a raw device value (tenths of a dB).
#[must_use]
pub fn percentile_to_decibel(percentile: f64) -> i32 {
    let percentile = if percentile.is_finite() {
        percentile.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let raw = (f64::from(LEGACY_VOLUME_SPAN) * (percentile / 100.0)
        - f64::from(LEGACY_VOLUME_OFFSET))
    .trunc() as i32;
    round_to_step(raw, LEGACY_VOLUME_STEP)
}

/// Converts a raw device value back to a percentile with 4 significant digits.
#[must_use]
pub fn decibel_to_percentile(decibel: i32) -> f64 {
    let percentile =
        f64::from(decibel + LEGACY_VOLUME_OFFSET) / (f64::from(LEGACY_VOLUME_SPAN) / 100.0);
    round_significant(percentile, 4)
}

/// Snaps to a multiple of `step`. Remainders below half a step round toward
/// zero, the rest away from zero.
fn round_to_step(value: i32, step: i32) -> i32 {
    let magnitude = value.abs();
    let diff = magnitude % step;
    let snapped = if f64::from(diff) < f64::from(step) / 2.0 {
        magnitude - diff
    } else {
        magnitude + (step - diff)
    };
    snapped * value.signum()
}

fn round_significant(value: f64, digits: i32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let factor = 10f64.powi(digits - 1 - magnitude);
    (value * factor).round() / factor
}
