//! Batch scoring commands

use anyhow::{Context, Result};
use colored::Colorize;
use detector_lib::{wire, BatchResult, RobustAnomalyScorer, ScoredReading, ScorerConfig};
use std::io::Read;
use std::path::Path;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_anomaly, color_score, format_value, print_json, print_success, print_warning,
    BatchView, OutputFormat,
};

/// Row for the scored readings table
#[derive(Tabled)]
struct ScoredRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Sensor")]
    sensor_id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Flagged")]
    flagged: String,
    #[tabled(rename = "Scores")]
    scores: String,
    #[tabled(rename = "Values")]
    values: String,
}

/// Score a request body in-process
pub fn score_local(input: Option<&Path>, config: ScorerConfig, view: &BatchView) -> Result<()> {
    let scorer = RobustAnomalyScorer::new(config).context("Invalid scorer configuration")?;
    let body = read_input(input)?;

    let readings = wire::parse_readings(&body, scorer.metrics())?;
    let result = scorer.score(&readings)?;

    render(&result, Some(scorer.threshold()), view)
}

/// Submit a request body to a running detector
pub async fn detect_remote(client: &ApiClient, input: Option<&Path>, view: &BatchView) -> Result<()> {
    let body = read_input(input)?;
    // Field validation is left to the detector so its messages reach the user
    let payload: serde_json::Value =
        serde_json::from_slice(&body).context("Input is not valid JSON")?;

    let result = client.detect(&payload).await?;

    render(&result, None, view)
}

fn read_input(input: Option<&Path>) -> Result<Vec<u8>> {
    match input {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read input file {}", path.display())),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn render(result: &BatchResult, threshold: Option<f64>, view: &BatchView) -> Result<()> {
    match view.format {
        OutputFormat::Json => print_json(result)?,
        OutputFormat::Table => {
            println!("{}", "Scored Readings".bold());
            println!("{}", "=".repeat(50));

            let rows: Vec<ScoredRow> = result
                .results
                .iter()
                .enumerate()
                .filter(|(_, r)| !view.anomalies_only || r.is_anomaly)
                .map(|(index, r)| to_row(index, r, threshold))
                .collect();

            if rows.is_empty() {
                println!("No readings to show");
            } else {
                let table = tabled::Table::new(rows)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{}", table);
            }
            println!();

            let summary = format!(
                "{} of {} readings anomalous",
                result.anomalies_detected, result.total_readings
            );
            if result.anomalies_detected > 0 {
                print_warning(&summary);
            } else {
                print_success(&summary);
            }
        }
    }

    Ok(())
}

fn to_row(index: usize, reading: &ScoredReading, threshold: Option<f64>) -> ScoredRow {
    let scores = reading
        .anomaly_scores
        .iter()
        .map(|(metric, score)| format!("{}={}", metric, color_score(*score, threshold)))
        .collect::<Vec<_>>()
        .join(", ");

    let values = reading
        .values
        .iter()
        .map(|(metric, value)| format!("{}={}", metric, format_value(*value)))
        .collect::<Vec<_>>()
        .join(", ");

    let flagged = if reading.anomalous_metrics.is_empty() {
        "-".to_string()
    } else {
        reading.anomalous_metrics.join(", ")
    };

    ScoredRow {
        index,
        sensor_id: reading.sensor_id.clone(),
        status: color_anomaly(reading.is_anomaly),
        flagged,
        scores,
        values,
    }
}
