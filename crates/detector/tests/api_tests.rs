//! Integration tests for the detector API endpoints

use anomaly_detector::api::{create_router, AppState};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use detector_lib::{
    health::{components, HealthRegistry},
    observability::{DetectorMetrics, StructuredLogger},
    RobustAnomalyScorer,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const MAX_BODY_BYTES: usize = 64 * 1024;

fn setup_test_app() -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(
        RobustAnomalyScorer::default(),
        HealthRegistry::with_components(&[components::SCORER, components::HTTP_API]),
        DetectorMetrics::new(),
        StructuredLogger::new("test-instance"),
    ));
    let router = create_router(state.clone(), MAX_BODY_BYTES);

    (router, state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn post_detect(app: Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/detect")
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_detect_successful_request() {
    let (app, _state) = setup_test_app();

    let body = json!({
        "readings": [
            {"sensor_id": "p-01", "temperature": 70, "vibration": 0.5},
            {"sensor_id": "p-02", "temperature": 71, "vibration": 0.48}
        ]
    });
    let (status, response) = post_detect(app, body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_readings"], 2);
    assert_eq!(response["anomalies_detected"], 0);
    assert_eq!(response["results"][0]["sensor_id"], "p-01");
    assert_eq!(response["results"][1]["sensor_id"], "p-02");
}

#[tokio::test]
async fn test_detect_documented_pump_example() {
    let (app, _state) = setup_test_app();

    let body = json!({
        "readings": [
            {"sensor_id": "pump-01", "temperature": 71.2, "vibration": 0.52},
            {"sensor_id": "pump-02", "temperature": 70.8, "vibration": 0.49},
            {"sensor_id": "pump-03", "temperature": 198.5, "vibration": 4.10}
        ]
    });
    let (status, response) = post_detect(app, body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_readings"], 3);
    assert_eq!(response["anomalies_detected"], 1);

    let results = response["results"].as_array().unwrap();
    assert_eq!(results[0]["is_anomaly"], false);
    assert_eq!(results[1]["is_anomaly"], false);

    let pump3 = &results[2];
    assert_eq!(pump3["sensor_id"], "pump-03");
    assert_eq!(pump3["temperature"], 198.5);
    assert_eq!(pump3["vibration"], 4.1);
    assert_eq!(pump3["is_anomaly"], true);
    assert_eq!(pump3["anomalous_metrics"], json!(["temperature", "vibration"]));
    assert!(pump3["anomaly_scores"]["temperature"].as_f64().unwrap() > 3.5);
    assert!(pump3["anomaly_scores"]["vibration"].as_f64().unwrap() > 3.5);
}

#[tokio::test]
async fn test_detect_anomaly_flagged_in_response() {
    let (app, _state) = setup_test_app();

    let mut readings: Vec<Value> = (0..20)
        .map(|i| json!({"sensor_id": format!("s-{}", i), "temperature": 70.0, "vibration": 0.5}))
        .collect();
    readings.push(json!({"sensor_id": "s-outlier", "temperature": 500.0, "vibration": 0.5}));

    let (status, response) = post_detect(app, json!({ "readings": readings }).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["anomalies_detected"], 1);
    assert_eq!(response["results"][20]["sensor_id"], "s-outlier");
    assert_eq!(response["results"][20]["is_anomaly"], true);
}

#[tokio::test]
async fn test_detect_missing_readings_key() {
    let (app, _state) = setup_test_app();

    let (status, response) = post_detect(app, json!({"data": []}).to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response["error"],
        "Request must include a non-empty 'readings' list"
    );
}

#[tokio::test]
async fn test_detect_empty_readings_rejected() {
    let (app, _state) = setup_test_app();

    let (status, _) = post_detect(app, json!({"readings": []}).to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_detect_missing_sensor_fields() {
    let (app, _state) = setup_test_app();

    let body = json!({"readings": [{"sensor_id": "p-01"}]});
    let (status, response) = post_detect(app, body.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].as_str().unwrap().contains("missing keys"));
}

#[tokio::test]
async fn test_detect_non_numeric_metric() {
    let (app, _state) = setup_test_app();

    let body = json!({"readings": [{"sensor_id": "p-01", "temperature": "warm", "vibration": 0.5}]});
    let (status, response) = post_detect(app, body.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].as_str().unwrap().contains("temperature"));
}

#[tokio::test]
async fn test_detect_malformed_json() {
    let (app, _state) = setup_test_app();

    let (status, response) = post_detect(app, "{not valid json}").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Malformed JSON in request body");
}

#[tokio::test]
async fn test_detect_rejects_oversized_body() {
    let (app, _state) = setup_test_app();

    let readings: Vec<Value> = (0..5000)
        .map(|i| json!({"sensor_id": format!("sensor-{:05}", i), "temperature": 70.0, "vibration": 0.5}))
        .collect();
    let body = json!({ "readings": readings }).to_string();
    assert!(body.len() > MAX_BODY_BYTES);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/detect")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app();

    let (status, body) = get(app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);

    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert!(health["components"]["scorer"].is_object());
    assert!(health["components"]["http_api"].is_object());
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let (app, state) = setup_test_app();

    state
        .health_registry
        .set_degraded(components::HTTP_API, "High latency")
        .await;

    let (status, body) = get(app, "/healthz").await;

    // Degraded still returns 200 (operational)
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app();

    state
        .health_registry
        .set_unhealthy(components::SCORER, "Scorer unavailable")
        .await;

    let (status, body) = get(app, "/healthz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_returns_503_when_not_ready() {
    let (app, _state) = setup_test_app();

    let (status, body) = get(app, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let readiness: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_readyz_returns_ok_when_ready() {
    let (app, state) = setup_test_app();

    state.health_registry.set_ready(true).await;

    let (status, body) = get(app, "/readyz").await;

    assert_eq!(status, StatusCode::OK);
    let readiness: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint_reports_scoring() {
    let (app, _state) = setup_test_app();

    let body = json!({
        "readings": [
            {"sensor_id": "a", "temperature": 70.0, "vibration": 0.5},
            {"sensor_id": "b", "temperature": 70.0, "vibration": 0.5}
        ]
    });
    let (status, _) = post_detect(app.clone(), body.to_string()).await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("anomaly_detector_scoring_latency_seconds_bucket"));
    assert!(metrics_text.contains("anomaly_detector_readings_scored_total"));
    assert!(metrics_text.contains("anomaly_detector_degenerate_metrics_total"));
}

#[tokio::test]
async fn test_successful_batch_restores_degraded_scorer() {
    let (app, state) = setup_test_app();

    state
        .health_registry
        .set_degraded(components::SCORER, "Last batch failed")
        .await;

    let body = json!({"readings": [{"sensor_id": "a", "temperature": 70.0, "vibration": 0.5}]});
    let (status, _) = post_detect(app, body.to_string()).await;
    assert_eq!(status, StatusCode::OK);

    let health = state.health_registry.health().await;
    assert_eq!(health.status, detector_lib::ComponentStatus::Healthy);
}
