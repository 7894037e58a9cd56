//! JSON request contract
//!
//! Turns a raw request body of the form
//! `{"readings": [{"sensor_id": "...", "temperature": 70.1, ...}, ...]}`
//! into a batch of [`Reading`]s. Key presence and JSON types are checked
//! here; finiteness of values is left to the scorer.

use crate::models::Reading;
use serde_json::Value;
use thiserror::Error;

/// Key carrying the reading identifier
pub const SENSOR_ID_KEY: &str = "sensor_id";

/// Request body rejections
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("Malformed JSON in request body")]
    MalformedJson,

    #[error("Request must include a non-empty 'readings' list")]
    MissingReadings,

    #[error("Reading at index {index} is missing keys: {keys:?}")]
    MissingKeys { index: usize, keys: Vec<String> },

    #[error("Reading at index {index} has invalid '{field}': {reason}")]
    InvalidField {
        index: usize,
        field: String,
        reason: String,
    },
}

impl RequestError {
    /// Short label for metrics and logs
    pub fn reason(&self) -> &'static str {
        match self {
            RequestError::MalformedJson => "malformed_json",
            RequestError::MissingReadings => "missing_readings",
            RequestError::MissingKeys { .. } => "missing_keys",
            RequestError::InvalidField { .. } => "invalid_field",
        }
    }
}

/// Parse a request body into readings carrying every metric in `metrics`
pub fn parse_readings(body: &[u8], metrics: &[String]) -> Result<Vec<Reading>, RequestError> {
    let payload: Value = serde_json::from_slice(body).map_err(|_| RequestError::MalformedJson)?;

    let entries = match payload.get("readings") {
        Some(Value::Array(entries)) if !entries.is_empty() => entries,
        _ => return Err(RequestError::MissingReadings),
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| parse_reading(index, entry, metrics))
        .collect()
}

fn parse_reading(index: usize, entry: &Value, metrics: &[String]) -> Result<Reading, RequestError> {
    let Some(object) = entry.as_object() else {
        return Err(RequestError::InvalidField {
            index,
            field: "reading".to_string(),
            reason: "expected a JSON object".to_string(),
        });
    };

    let mut missing: Vec<String> = std::iter::once(SENSOR_ID_KEY)
        .chain(metrics.iter().map(String::as_str))
        .filter(|key| !object.contains_key(*key))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(RequestError::MissingKeys {
            index,
            keys: missing,
        });
    }

    let sensor_id = match &object[SENSOR_ID_KEY] {
        Value::String(id) => id.clone(),
        _ => {
            return Err(RequestError::InvalidField {
                index,
                field: SENSOR_ID_KEY.to_string(),
                reason: "expected a string".to_string(),
            })
        }
    };

    let mut reading = Reading::new(sensor_id);
    for metric in metrics {
        let value = object[metric.as_str()]
            .as_f64()
            .ok_or_else(|| RequestError::InvalidField {
                index,
                field: metric.clone(),
                reason: "expected a number".to_string(),
            })?;
        reading = reading.with_value(metric.clone(), value);
    }

    Ok(reading)
}
