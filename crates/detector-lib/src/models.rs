//! Core data models for the anomaly detector

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric names scored when no configuration overrides them
pub const DEFAULT_METRICS: [&str; 2] = ["temperature", "vibration"];

/// A single sensor observation
///
/// Metric values are flattened next to `sensor_id` on the wire, so
/// `{"sensor_id": "pump-01", "temperature": 71.2, "vibration": 0.52}`
/// maps to a reading with two values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub sensor_id: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl Reading {
    pub fn new(sensor_id: impl Into<String>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            values: BTreeMap::new(),
        }
    }

    /// Attach a metric value
    pub fn with_value(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.values.insert(metric.into(), value);
        self
    }

    /// Shorthand for the default temperature/vibration pair
    pub fn sensor(sensor_id: impl Into<String>, temperature: f64, vibration: f64) -> Self {
        Self::new(sensor_id)
            .with_value("temperature", temperature)
            .with_value("vibration", vibration)
    }

    pub fn value(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied()
    }
}

/// A reading together with its per-metric scores and anomaly decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredReading {
    pub sensor_id: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
    pub is_anomaly: bool,
    /// Signed scores rounded to four decimal places
    ///
    /// Negative values sit below the batch median. A metric is flagged when
    /// the absolute score exceeds the threshold.
    pub anomaly_scores: BTreeMap<String, f64>,
    /// Metrics that exceeded the threshold, in configured order
    pub anomalous_metrics: Vec<String>,
}

/// Scored output for one batch, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total_readings: usize,
    pub anomalies_detected: usize,
    pub results: Vec<ScoredReading>,
}

impl BatchResult {
    pub fn empty() -> Self {
        Self {
            total_readings: 0,
            anomalies_detected: 0,
            results: Vec::new(),
        }
    }

    pub fn from_results(results: Vec<ScoredReading>) -> Self {
        let anomalies_detected = results.iter().filter(|r| r.is_anomaly).count();
        Self {
            total_readings: results.len(),
            anomalies_detected,
            results,
        }
    }

    /// Iterate over the flagged readings only
    pub fn anomalies(&self) -> impl Iterator<Item = &ScoredReading> {
        self.results.iter().filter(|r| r.is_anomaly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_deserializes_flattened_metrics() {
        let reading: Reading = serde_json::from_str(
            r#"{"sensor_id": "pump-01", "temperature": 71.2, "vibration": 0.52}"#,
        )
        .unwrap();

        assert_eq!(reading.sensor_id, "pump-01");
        assert_eq!(reading.value("temperature"), Some(71.2));
        assert_eq!(reading.value("vibration"), Some(0.52));
        assert_eq!(reading.value("pressure"), None);
    }

    #[test]
    fn test_scored_reading_wire_shape() {
        let scored = ScoredReading {
            sensor_id: "pump-03".to_string(),
            values: Reading::sensor("pump-03", 198.5, 4.1).values,
            is_anomaly: true,
            anomaly_scores: BTreeMap::from([
                ("temperature".to_string(), 214.6609),
                ("vibration".to_string(), 80.4904),
            ]),
            anomalous_metrics: vec!["temperature".to_string(), "vibration".to_string()],
        };

        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["sensor_id"], "pump-03");
        assert_eq!(json["temperature"], 198.5);
        assert_eq!(json["vibration"], 4.1);
        assert_eq!(json["is_anomaly"], true);
        assert_eq!(json["anomaly_scores"]["temperature"], 214.6609);
        assert_eq!(json["anomalous_metrics"][1], "vibration");

        let back: ScoredReading = serde_json::from_value(json).unwrap();
        assert_eq!(back, scored);
    }

    #[test]
    fn test_batch_result_counts() {
        let normal = ScoredReading {
            sensor_id: "a".to_string(),
            values: BTreeMap::new(),
            is_anomaly: false,
            anomaly_scores: BTreeMap::new(),
            anomalous_metrics: vec![],
        };
        let flagged = ScoredReading {
            sensor_id: "b".to_string(),
            is_anomaly: true,
            anomalous_metrics: vec!["temperature".to_string()],
            ..normal.clone()
        };

        let result = BatchResult::from_results(vec![normal, flagged]);
        assert_eq!(result.total_readings, 2);
        assert_eq!(result.anomalies_detected, 1);
        assert_eq!(result.anomalies().next().unwrap().sensor_id, "b");
        assert_eq!(BatchResult::empty().total_readings, 0);
    }
}
