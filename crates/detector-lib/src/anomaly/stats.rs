//! Order statistics and moments over a single metric series
//!
//! All functions expect finite values; the scorer rejects NaN and
//! infinities before a series reaches this module.

use serde::Serialize;

/// Decimal places kept in reported scores
const SCORE_DECIMALS: i32 = 4;

/// Robust location/scale estimate for one metric of one batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RobustStatistic {
    pub median: f64,
    /// Median absolute deviation from `median`, never negative
    pub mad: f64,
}

impl RobustStatistic {
    /// Compute median and MAD for a series
    ///
    /// Returns `None` for an empty series.
    pub fn from_series(series: &[f64]) -> Option<Self> {
        let center = median(series)?;
        let deviations: Vec<f64> = series.iter().map(|x| (x - center).abs()).collect();
        let mad = median(&deviations)?;
        Some(Self {
            median: center,
            mad,
        })
    }
}

/// Rank-based median; even-length series average the two central values
pub fn median(series: &[f64]) -> Option<f64> {
    if series.is_empty() {
        return None;
    }

    let mut sorted = series.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n % 2 == 0 {
        let (lo, hi) = (sorted[n / 2 - 1], sorted[n / 2]);
        // Midpoint without overflowing near f64::MAX
        Some(lo + (hi - lo) / 2.0)
    } else {
        Some(sorted[n / 2])
    }
}

/// Arithmetic mean and population (ddof = 0) standard deviation
pub fn mean_and_population_std(series: &[f64]) -> Option<(f64, f64)> {
    if series.is_empty() {
        return None;
    }

    // Welford update; stays finite for values near f64::MAX
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (i, x) in series.iter().enumerate() {
        let delta = x - mean;
        mean += delta / (i + 1) as f64;
        m2 += delta * (x - mean);
    }

    Some((mean, (m2 / series.len() as f64).sqrt()))
}

/// Round a score to the reported precision
pub fn round_score(score: f64) -> f64 {
    let scale = 10f64.powi(SCORE_DECIMALS);
    (score * scale).round() / scale
}
