//! Anomaly scoring for batches of sensor readings
//!
//! This module provides:
//! - Robust location/scale statistics (median, MAD)
//! - Modified Z-Score scoring with a classical Z-Score fallback for
//!   batches whose MAD collapses to zero

mod robust_scorer;
pub mod stats;

pub use robust_scorer::{
    MetricBaseline, RobustAnomalyScorer, ScoredBatch, ScorerConfig, ScoringMethod,
    DEFAULT_CONSISTENCY_CONSTANT, DEFAULT_THRESHOLD,
};
pub use stats::RobustStatistic;
