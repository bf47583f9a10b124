//! Shared output helpers for list and show commands.

use anyhow::{Context, Result};
use serde::Serialize;

/// How records are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

/// Print `value` as JSON or YAML. Returns false for table output, which
/// each command renders itself.
pub fn emit<T: Serialize + ?Sized>(format: OutputFormat, value: &T) -> Result<bool> {
    match format {
        OutputFormat::Table => Ok(false),
        OutputFormat::Json => {
            let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
            println!("{}", out);
            Ok(true)
        }
        OutputFormat::Yaml => {
            let out = serde_yaml::to_string(value).context("Failed to serialize output")?;
            print!("{}", out);
            Ok(true)
        }
    }
}

/// kWh with at most two decimals and no trailing zeros.
pub fn kwh(value: f64) -> String {
    let s = format!("{:.2}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    format!("{} kWh", s)
}

pub fn pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v),
        None => "-".to_string(),
    }
}

/// Cut a label to fit a table column.
pub fn fit(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}
