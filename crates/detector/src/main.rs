//! Anomaly Detector - robust batch scoring service for sensor readings
//!
//! Accepts batches of temperature/vibration readings over HTTP and flags
//! statistically anomalous ones with a median/MAD Modified Z-Score.

use anomaly_detector::{api, config::ServiceConfig};
use anyhow::{Context, Result};
use detector_lib::{
    health::{components, HealthRegistry},
    observability::{DetectorMetrics, StructuredLogger},
    RobustAnomalyScorer,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DETECTOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting anomaly-detector");

    let config = ServiceConfig::load()?;
    info!(instance = %config.instance_name, port = config.api_port, "Detector configured");

    let scorer = RobustAnomalyScorer::new(config.scorer_config())
        .context("Invalid scorer configuration")?;

    let health_registry = HealthRegistry::with_components(&[
        components::SCORER,
        components::HTTP_API,
    ]);

    let metrics = DetectorMetrics::new();
    metrics.set_scorer_info(scorer.metrics(), scorer.threshold());

    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(DETECTOR_VERSION, scorer.metrics(), scorer.threshold());

    let app_state = Arc::new(api::AppState::new(
        scorer,
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));

    health_registry.set_ready(true).await;

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    };

    api::serve(config.api_port, config.max_body_bytes, app_state, shutdown).await?;

    health_registry.set_ready(false).await;
    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
