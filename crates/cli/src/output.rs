//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// How a scored batch should be rendered
#[derive(Debug, Clone, Copy)]
pub struct BatchView {
    pub format: OutputFormat,
    pub anomalies_only: bool,
}

/// Pretty-print any serializable value as JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format a score with its reported precision
pub fn format_score(score: f64) -> String {
    format!("{:.4}", score)
}

/// Format a raw sensor value
pub fn format_value(value: f64) -> String {
    // Trim noise like 70.80000000000001 without hiding real precision
    let formatted = format!("{:.6}", value);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Render the anomaly flag
pub fn color_anomaly(is_anomaly: bool) -> String {
    if is_anomaly {
        "ANOMALY".red().bold().to_string()
    } else {
        "ok".green().to_string()
    }
}

/// Color a score by how close it is to the threshold
pub fn color_score(score: f64, threshold: Option<f64>) -> String {
    let formatted = format_score(score);
    match threshold {
        Some(t) if score.abs() > t => formatted.red().to_string(),
        Some(t) if score.abs() > t * 0.75 => formatted.yellow().to_string(),
        _ => formatted,
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "ready" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" | "not ready" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Format a unix timestamp for display
pub fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(214.6609), "214.6609");
        assert_eq!(format_score(-0.5), "-0.5000");
    }

    #[test]
    fn test_format_value_trims_noise() {
        assert_eq!(format_value(70.80000000000001), "70.8");
        assert_eq!(format_value(70.0), "70");
        assert_eq!(format_value(0.52), "0.52");
    }

    #[test]
    fn test_color_score_without_threshold_is_plain() {
        assert_eq!(color_score(1.25, None), "1.2500");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00");
    }
}
