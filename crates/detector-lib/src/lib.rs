//! Core library for the sensor anomaly detector
//!
//! This crate provides:
//! - Robust (median/MAD) anomaly scoring for batches of sensor readings
//! - Parsing of the JSON request contract into validated batches
//! - Health checks and observability shared by the service and CLI

pub mod anomaly;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod wire;

pub use anomaly::{RobustAnomalyScorer, ScoredBatch, ScorerConfig};
pub use error::{ReadingDefect, ScoreError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{DetectorMetrics, StructuredLogger};
