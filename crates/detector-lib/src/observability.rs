//! Observability infrastructure for the anomaly detector
//!
//! Provides:
//! - Prometheus metrics (scoring latency, batch sizes, anomaly and rejection counts)
//! - Structured JSON logging with tracing

use crate::anomaly::{MetricBaseline, ScoringMethod};
use crate::models::{BatchResult, ScoredReading};
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for scoring latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5,
];

/// Histogram buckets for readings per batch
const BATCH_SIZE_BUCKETS: &[f64] = &[1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0, 5000.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DetectorMetricsInner> = OnceLock::new();

struct DetectorMetricsInner {
    scoring_latency_seconds: Histogram,
    batch_size: Histogram,
    readings_scored: IntCounter,
    anomalies_detected: IntCounter,
    rejected_requests: IntCounterVec,
    degenerate_metrics: IntCounterVec,
    scorer_info: GaugeVec,
}

impl DetectorMetricsInner {
    fn new() -> Self {
        Self {
            scoring_latency_seconds: register_histogram!(
                "anomaly_detector_scoring_latency_seconds",
                "Time spent scoring one batch of readings",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register scoring_latency_seconds"),

            batch_size: register_histogram!(
                "anomaly_detector_batch_size",
                "Number of readings per scored batch",
                BATCH_SIZE_BUCKETS.to_vec()
            )
            .expect("Failed to register batch_size"),

            readings_scored: register_int_counter!(
                "anomaly_detector_readings_scored_total",
                "Total number of readings scored"
            )
            .expect("Failed to register readings_scored"),

            anomalies_detected: register_int_counter!(
                "anomaly_detector_anomalies_detected_total",
                "Total number of readings flagged as anomalous"
            )
            .expect("Failed to register anomalies_detected"),

            rejected_requests: register_int_counter_vec!(
                "anomaly_detector_rejected_requests_total",
                "Total number of rejected detection requests",
                &["reason"]
            )
            .expect("Failed to register rejected_requests"),

            degenerate_metrics: register_int_counter_vec!(
                "anomaly_detector_degenerate_metrics_total",
                "Metric series scored with a fallback because their MAD was zero",
                &["metric", "method"]
            )
            .expect("Failed to register degenerate_metrics"),

            scorer_info: register_gauge_vec!(
                "anomaly_detector_scorer_info",
                "Configuration of the active scorer",
                &["metrics", "threshold"]
            )
            .expect("Failed to register scorer_info"),
        }
    }
}

/// Detector metrics for Prometheus exposition
///
/// Lightweight handle to the process-wide metrics; clones share the same
/// underlying collectors.
#[derive(Clone)]
pub struct DetectorMetrics {
    _private: (),
}

impl Default for DetectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorMetrics {
    /// Create a metrics handle (registers the collectors on first call)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DetectorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DetectorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_scoring_latency(&self, duration_secs: f64) {
        self.inner().scoring_latency_seconds.observe(duration_secs);
    }

    /// Record the outcome of one scored batch
    pub fn record_batch(&self, result: &BatchResult) {
        let inner = self.inner();
        inner.batch_size.observe(result.total_readings as f64);
        inner.readings_scored.inc_by(result.total_readings as u64);
        inner.anomalies_detected.inc_by(result.anomalies_detected as u64);
    }

    pub fn inc_rejected(&self, reason: &str) {
        self.inner()
            .rejected_requests
            .with_label_values(&[reason])
            .inc();
    }

    pub fn inc_degenerate(&self, metric: &str, method: ScoringMethod) {
        self.inner()
            .degenerate_metrics
            .with_label_values(&[metric, method.as_str()])
            .inc();
    }

    /// Publish the active scorer configuration
    pub fn set_scorer_info(&self, metrics: &[String], threshold: f64) {
        let metrics = metrics.join(",");
        let threshold = threshold.to_string();

        let inner = self.inner();
        inner.scorer_info.reset();
        inner
            .scorer_info
            .with_label_values(&[metrics.as_str(), threshold.as_str()])
            .set(1.0);
    }
}

/// Structured logger for detector events
///
/// Keeps the event vocabulary in one place so every log line for a batch
/// carries the same field names.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, metrics: &[String], threshold: f64) {
        info!(
            event = "detector_started",
            instance = %self.instance,
            version = %version,
            metrics = %metrics.join(","),
            threshold = threshold,
            "Anomaly detector started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "detector_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Anomaly detector shutting down"
        );
    }

    /// Log the summary of a scored batch
    pub fn log_batch_scored(&self, result: &BatchResult, elapsed_secs: f64) {
        info!(
            event = "batch_scored",
            instance = %self.instance,
            total_readings = result.total_readings,
            anomalies_detected = result.anomalies_detected,
            elapsed_ms = elapsed_secs * 1000.0,
            "Processed {} readings, {} anomalies detected",
            result.total_readings,
            result.anomalies_detected
        );
    }

    /// Log a single flagged reading
    pub fn log_anomaly(&self, reading: &ScoredReading) {
        let scores = reading
            .anomalous_metrics
            .iter()
            .filter_map(|m| reading.anomaly_scores.get(m).map(|s| format!("{}={}", m, s)))
            .collect::<Vec<_>>()
            .join(",");

        warn!(
            event = "anomaly_detected",
            instance = %self.instance,
            sensor_id = %reading.sensor_id,
            metrics = %reading.anomalous_metrics.join(","),
            scores = %scores,
            "Anomalous reading detected"
        );
    }

    pub fn log_rejected_request(&self, reason: &str, details: &str) {
        warn!(
            event = "request_rejected",
            instance = %self.instance,
            reason = %reason,
            details = %details,
            "Detection request rejected"
        );
    }

    /// Log a metric that was scored with a fallback method
    pub fn log_degenerate_metric(&self, baseline: &MetricBaseline) {
        debug!(
            event = "degenerate_metric",
            instance = %self.instance,
            metric = %baseline.metric,
            method = baseline.method.as_str(),
            median = baseline.statistic.median,
            "MAD is zero, using fallback scoring"
        );
    }
}
