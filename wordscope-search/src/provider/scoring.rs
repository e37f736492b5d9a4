//! Per-batch min-max score normalization.
//!
//! Raw upstream scores are only comparable within one fetch, so every
//! batch is rescaled on its own:
//!
//! ```text
//! normalized = (raw - min) / (max - min)
//! ```
//!
//! A batch whose scores are all equal (including a single-record batch)
//! normalizes to `0.0` everywhere.

use crate::types::RawRecord;

/// Normalize one raw score against its batch bounds.
///
/// Returns `0.0` when `max == min` or when any input is not finite.
pub fn min_max_normalize(raw: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if !range.is_finite() || !raw.is_finite() || range <= 0.0 {
        return 0.0;
    }
    ((raw - min) / range).clamp(0.0, 1.0)
}

/// Normalize a whole batch, pairing each word with its scaled score.
///
/// Order is preserved.
pub fn normalize_scores(records: &[RawRecord]) -> Vec<(String, f64)> {
    let (min, max) = records
        .iter()
        .map(|r| r.score)
        .filter(|s| s.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(s), hi.max(s))
        });

    records
        .iter()
        .map(|r| (r.word.clone(), min_max_normalize(r.score, min, max)))
        .collect()
}
