//! Sensor Anomaly Detector CLI
//!
//! Scores batches of sensor readings locally, submits them to a running
//! detector service, and checks detector health.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, score};
use detector_lib::ScorerConfig;
use std::path::PathBuf;

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Sensor Anomaly Detector CLI
#[derive(Parser)]
#[command(name = "pdm")]
#[command(author, version, about = "CLI for the Sensor Anomaly Detector", long_about = None)]
pub struct Cli {
    /// Detector API URL (can also be set via PDM_API_URL env var)
    #[arg(long, env = "PDM_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, value_enum)]
    pub format: Option<output::OutputFormat>,

    /// Only list anomalous readings in table output
    #[arg(long)]
    pub anomalies_only: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score a batch of readings locally
    Score {
        /// Request body file ({"readings": [...]}); reads stdin if omitted
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Flag readings whose |score| exceeds this value
        #[arg(long)]
        threshold: Option<f64>,

        /// Comma separated metrics to score
        #[arg(long, value_delimiter = ',')]
        metrics: Option<Vec<String>>,
    },

    /// Send a batch of readings to a running detector
    Detect {
        /// Request body file ({"readings": [...]}); reads stdin if omitted
        #[arg(long, short)]
        input: Option<PathBuf>,
    },

    /// Show detector health
    Health,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let file_config = config::Config::load()?;

    let format = cli
        .format
        .or_else(|| file_config.default_format())
        .unwrap_or_default();
    let view = output::BatchView {
        format,
        anomalies_only: cli.anomalies_only,
    };
    let api_url = cli
        .api_url
        .or_else(|| file_config.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    match cli.command {
        Commands::Score {
            input,
            threshold,
            metrics,
        } => {
            let mut scorer_config = ScorerConfig::default();
            if let Some(threshold) = threshold.or(file_config.threshold) {
                scorer_config = scorer_config.with_threshold(threshold);
            }
            if let Some(metrics) = metrics.or_else(|| file_config.metrics.clone()) {
                scorer_config = scorer_config.with_metrics(metrics);
            }
            score::score_local(input.as_deref(), scorer_config, &view)?;
        }
        Commands::Detect { input } => {
            let client = client::ApiClient::new(&api_url)?;
            score::detect_remote(&client, input.as_deref(), &view).await?;
        }
        Commands::Health => {
            let client = client::ApiClient::new(&api_url)?;
            health::show_health(&client, format).await?;
        }
    }

    Ok(())
}
