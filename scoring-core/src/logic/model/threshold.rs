//! Percentile Threshold
//!
//! One global cutoff per request, computed over every score in the upload.
//! The value depends only on the score set and the percentile, never on the
//! page being viewed.
//!
//! Interpolation: for ascending scores `s` of length n,
//! `r = P/100 * (n-1)`, value = `s[⌊r⌋] + (r - ⌊r⌋) * (s[⌈r⌉] - s[⌊r⌋])`.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PERCENTILE, MAX_PERCENTILE, MIN_PERCENTILE};
use crate::error::{PipelineError, Result};

/// Threshold Configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Percentile used when the caller does not pass one
    pub default_percentile: f64,

    /// Lowest accepted percentile
    pub min_percentile: f64,

    /// Highest accepted percentile
    pub max_percentile: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            default_percentile: DEFAULT_PERCENTILE,
            min_percentile: MIN_PERCENTILE,
            max_percentile: MAX_PERCENTILE,
        }
    }
}

impl ThresholdConfig {
    /// Requested percentile, or the default, checked against the bounds
    pub fn resolve(&self, requested: Option<f64>) -> Result<f64> {
        let p = requested.unwrap_or(self.default_percentile);
        if !p.is_finite() || p < self.min_percentile || p > self.max_percentile {
            return Err(PipelineError::invalid_parameter(
                "percentile",
                format!(
                    "must be between {} and {}, got {}",
                    self.min_percentile, self.max_percentile, p
                ),
            ));
        }
        Ok(p)
    }
}

/// Global anomaly cutoff
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub value: f64,
    pub percentile: f64,
}

impl Threshold {
    /// Scores at or above the cutoff are anomalous
    pub fn is_anomaly(&self, score: f64) -> bool {
        score >= self.value
    }
}

/// P-th percentile of `scores` with linear interpolation.
///
/// `percentile` must lie in [0, 100]; bound checks against the service
/// range happen in `ThresholdConfig::resolve`.
pub fn percentile_threshold(scores: &[f64], percentile: f64) -> Result<Threshold> {
    if scores.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    if !(0.0..=100.0).contains(&percentile) {
        return Err(PipelineError::invalid_parameter(
            "percentile",
            format!("must be within [0, 100], got {}", percentile),
        ));
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = percentile / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    let value = sorted[lo] + frac * (sorted[hi] - sorted[lo]);

    log::debug!(
        "Threshold p{} over {} scores: rank {:.3} → {}",
        percentile,
        sorted.len(),
        rank,
        value
    );

    Ok(Threshold { value, percentile })
}
