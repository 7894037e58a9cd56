//! Robust batch scoring
//!
//! Scores every configured metric of a batch with the Modified Z-Score:
//!
//! ```text
//! MAD   = median(|x_i - median(X)|)
//! M_i   = 0.6745 * (x_i - median(X)) / MAD
//! ```
//!
//! Median and MAD barely move when a batch contains a few extreme values,
//! so a single spike cannot mask itself by inflating the scale estimate the
//! way it would with mean and standard deviation. When MAD is zero (constant
//! output, or most of a small batch sharing one value) the metric falls back
//! to a classical Z-Score, and to all-zero scores if the series has no
//! variance at all.

use super::stats::{mean_and_population_std, round_score, RobustStatistic};
use crate::error::{ReadingDefect, Result, ScoreError};
use crate::models::{BatchResult, Reading, ScoredReading, DEFAULT_METRICS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Default flagging threshold on |score|
pub const DEFAULT_THRESHOLD: f64 = 3.5;

/// 0.75 quantile of the standard normal; makes MAD consistent with sigma
pub const DEFAULT_CONSISTENCY_CONSTANT: f64 = 0.6745;

/// Scorer configuration, fixed for the lifetime of a scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// Metrics to score, in reporting order
    #[serde(default = "default_metrics")]
    pub metrics: Vec<String>,

    /// A reading is anomalous on a metric when |score| exceeds this
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default = "default_consistency_constant")]
    pub consistency_constant: f64,
}

fn default_metrics() -> Vec<String> {
    DEFAULT_METRICS.iter().map(|m| m.to_string()).collect()
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_consistency_constant() -> f64 {
    DEFAULT_CONSISTENCY_CONSTANT
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            metrics: default_metrics(),
            threshold: default_threshold(),
            consistency_constant: default_consistency_constant(),
        }
    }
}

impl ScorerConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics = metrics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_consistency_constant(mut self, constant: f64) -> Self {
        self.consistency_constant = constant;
        self
    }

    /// Check that the configuration can produce meaningful scores
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(ScoreError::InvalidParameter {
                name: "threshold",
                reason: format!("must be a positive number, got {}", self.threshold),
            });
        }

        if !(self.consistency_constant.is_finite() && self.consistency_constant > 0.0) {
            return Err(ScoreError::InvalidParameter {
                name: "consistency_constant",
                reason: format!(
                    "must be a positive number, got {}",
                    self.consistency_constant
                ),
            });
        }

        if self.metrics.is_empty() {
            return Err(ScoreError::InvalidParameter {
                name: "metrics",
                reason: "at least one metric is required".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for metric in &self.metrics {
            if metric.trim().is_empty() {
                return Err(ScoreError::InvalidParameter {
                    name: "metrics",
                    reason: "metric names must not be blank".to_string(),
                });
            }
            if !seen.insert(metric.as_str()) {
                return Err(ScoreError::InvalidParameter {
                    name: "metrics",
                    reason: format!("duplicate metric '{}'", metric),
                });
            }
        }

        Ok(())
    }
}

/// How a metric's scores were derived for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    /// Median/MAD based Modified Z-Score
    ModifiedZ,
    /// MAD was zero; mean/population-std Z-Score
    ClassicalZ,
    /// MAD and std were both zero; every score is 0
    Constant,
}

impl ScoringMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMethod::ModifiedZ => "modified_z",
            ScoringMethod::ClassicalZ => "classical_z",
            ScoringMethod::Constant => "constant",
        }
    }
}

/// Per-metric baseline of one batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricBaseline {
    pub metric: String,
    pub statistic: RobustStatistic,
    pub method: ScoringMethod,
}

impl MetricBaseline {
    /// True when the MAD collapsed and a fallback was used
    pub fn is_degenerate(&self) -> bool {
        self.method != ScoringMethod::ModifiedZ
    }
}

/// Batch result plus the baselines it was scored against
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredBatch {
    pub result: BatchResult,
    /// One entry per configured metric, in configured order
    pub baselines: Vec<MetricBaseline>,
}

/// Stateless median/MAD anomaly scorer
///
/// Holds only immutable configuration, so one instance can be shared
/// across threads and requests.
#[derive(Debug, Clone)]
pub struct RobustAnomalyScorer {
    config: ScorerConfig,
}

impl Default for RobustAnomalyScorer {
    fn default() -> Self {
        Self {
            config: ScorerConfig::default(),
        }
    }
}

impl RobustAnomalyScorer {
    /// Create a scorer, rejecting invalid configuration
    pub fn new(config: ScorerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Default metrics and constant with a custom threshold
    pub fn with_threshold(threshold: f64) -> Result<Self> {
        Self::new(ScorerConfig::default().with_threshold(threshold))
    }

    pub fn metrics(&self) -> &[String] {
        &self.config.metrics
    }

    pub fn threshold(&self) -> f64 {
        self.config.threshold
    }

    /// Score a batch of readings
    ///
    /// # Returns
    /// * One scored reading per input, in input order
    /// * `ScoreError::InvalidReading` if any reading lacks a configured
    ///   metric or holds a non-finite value; nothing is scored in that case
    pub fn score(&self, batch: &[Reading]) -> Result<BatchResult> {
        self.score_with_baselines(batch).map(|scored| scored.result)
    }

    /// Score a batch and also return the per-metric baselines
    pub fn score_with_baselines(&self, batch: &[Reading]) -> Result<ScoredBatch> {
        if batch.is_empty() {
            return Ok(ScoredBatch {
                result: BatchResult::empty(),
                baselines: Vec::new(),
            });
        }

        let series_by_metric = self.extract_series(batch)?;

        let mut scores_by_metric = Vec::with_capacity(series_by_metric.len());
        let mut baselines = Vec::with_capacity(series_by_metric.len());
        for (metric, series) in self.config.metrics.iter().zip(&series_by_metric) {
            let Some((scores, statistic, method)) = self.score_series(series) else {
                continue;
            };
            scores_by_metric.push((metric, scores));
            baselines.push(MetricBaseline {
                metric: metric.clone(),
                statistic,
                method,
            });
        }

        let results = batch
            .iter()
            .enumerate()
            .map(|(i, reading)| {
                let mut anomaly_scores = BTreeMap::new();
                let mut anomalous_metrics = Vec::new();

                for (metric, scores) in &scores_by_metric {
                    let score = scores[i];
                    // Decide on the full-precision score, report the rounded one
                    if score.abs() > self.config.threshold {
                        anomalous_metrics.push((*metric).clone());
                    }
                    anomaly_scores.insert((*metric).clone(), round_score(score));
                }

                ScoredReading {
                    sensor_id: reading.sensor_id.clone(),
                    values: reading.values.clone(),
                    is_anomaly: !anomalous_metrics.is_empty(),
                    anomaly_scores,
                    anomalous_metrics,
                }
            })
            .collect();

        Ok(ScoredBatch {
            result: BatchResult::from_results(results),
            baselines,
        })
    }

    /// Collect one series per configured metric, validating readings in
    /// input order
    fn extract_series(&self, batch: &[Reading]) -> Result<Vec<Vec<f64>>> {
        let mut series_by_metric = vec![Vec::with_capacity(batch.len()); self.config.metrics.len()];

        for (index, reading) in batch.iter().enumerate() {
            for (metric, series) in self.config.metrics.iter().zip(series_by_metric.iter_mut()) {
                let defect = match reading.value(metric) {
                    Some(value) if value.is_finite() => {
                        series.push(value);
                        continue;
                    }
                    Some(value) => ReadingDefect::NonFinite(value),
                    None => ReadingDefect::Missing,
                };

                return Err(ScoreError::InvalidReading {
                    index,
                    sensor_id: reading.sensor_id.clone(),
                    metric: metric.clone(),
                    defect,
                });
            }
        }

        Ok(series_by_metric)
    }

    /// Score one metric series; `None` only for an empty series
    fn score_series(&self, series: &[f64]) -> Option<(Vec<f64>, RobustStatistic, ScoringMethod)> {
        let statistic = RobustStatistic::from_series(series)?;

        if statistic.mad != 0.0 {
            let scale = self.config.consistency_constant / statistic.mad;
            let scores = series
                .iter()
                .map(|x| scale * (x - statistic.median))
                .collect();
            return Some((scores, statistic, ScoringMethod::ModifiedZ));
        }

        let (mean, std) = mean_and_population_std(series)?;
        if std == 0.0 {
            return Some((vec![0.0; series.len()], statistic, ScoringMethod::Constant));
        }

        let scores = series.iter().map(|x| (x - mean) / std).collect();
        Some((scores, statistic, ScoringMethod::ClassicalZ))
    }
}
