//! Error types for anomaly scoring

use std::fmt;
use thiserror::Error;

/// Why a reading's metric value could not be scored
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadingDefect {
    /// The reading carries no value for the metric
    Missing,
    /// The value is NaN or infinite
    NonFinite(f64),
}

impl fmt::Display for ReadingDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingDefect::Missing => write!(f, "is missing"),
            ReadingDefect::NonFinite(v) => write!(f, "is not a finite number ({})", v),
        }
    }
}

/// Scoring errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("Invalid reading at index {index} (sensor '{sensor_id}'): metric '{metric}' {defect}")]
    InvalidReading {
        index: usize,
        sensor_id: String,
        metric: String,
        defect: ReadingDefect,
    },

    #[error("Invalid parameter: {name} - {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl ScoreError {
    /// True when the failure was caused by the submitted data rather than
    /// by the scorer's own configuration
    pub fn is_client_error(&self) -> bool {
        matches!(self, ScoreError::InvalidReading { .. })
    }
}

/// Result type for scoring operations.
pub type Result<T> = std::result::Result<T, ScoreError>;
