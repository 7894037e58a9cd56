//! HTTP API for anomaly detection, health checks and Prometheus metrics

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use detector_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    observability::{DetectorMetrics, StructuredLogger},
    wire::{self, RequestError},
    BatchResult, RobustAnomalyScorer, ScoreError,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub scorer: Arc<RobustAnomalyScorer>,
    pub health_registry: HealthRegistry,
    pub metrics: DetectorMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        scorer: RobustAnomalyScorer,
        health_registry: HealthRegistry,
        metrics: DetectorMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            scorer: Arc::new(scorer),
            health_registry,
            metrics,
            logger,
        }
    }
}

/// Failures of a detection request
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Score(#[from] ScoreError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Request(_) => StatusCode::BAD_REQUEST,
            ApiError::Score(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Score(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for the rejection counter
    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::Request(e) => e.reason(),
            ApiError::Score(ScoreError::InvalidReading { .. }) => "invalid_reading",
            ApiError::Score(ScoreError::InvalidParameter { .. }) => "internal",
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal details stay in the logs
        let error = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

/// Score a batch of readings
async fn detect(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<BatchResult>, ApiError> {
    match score_body(&state, &body) {
        Ok(result) => {
            state.health_registry.restore(components::SCORER).await;
            Ok(Json(result))
        }
        Err(e) => {
            state.metrics.inc_rejected(e.reason());
            if e.status_code().is_server_error() {
                error!(error = %e, "Unexpected error during scoring");
                state
                    .health_registry
                    .set_degraded(components::SCORER, format!("Last batch failed: {}", e))
                    .await;
            } else {
                state
                    .logger
                    .log_rejected_request(e.reason(), &e.to_string());
            }
            Err(e)
        }
    }
}

fn score_body(state: &AppState, body: &[u8]) -> Result<BatchResult, ApiError> {
    let readings = wire::parse_readings(body, state.scorer.metrics())?;

    let started = Instant::now();
    let scored = state.scorer.score_with_baselines(&readings)?;
    let elapsed = started.elapsed().as_secs_f64();

    state.metrics.observe_scoring_latency(elapsed);
    state.metrics.record_batch(&scored.result);

    for baseline in scored.baselines.iter().filter(|b| b.is_degenerate()) {
        state.metrics.inc_degenerate(&baseline.metric, baseline.method);
        state.logger.log_degenerate_metric(baseline);
    }
    for reading in scored.result.anomalies() {
        state.logger.log_anomaly(reading);
    }
    state.logger.log_batch_scored(&scored.result, elapsed);

    Ok(scored.result)
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/v1/detect", post(detect))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Serve the API until `shutdown` resolves
pub async fn serve(
    port: u16,
    max_body_bytes: usize,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state, max_body_bytes);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
