//! Writers for pipeline results
//!
//! Per-recording series (RR intervals and Lorenz points) go to CSV files;
//! the per-run summary goes to stdout through a [`Formatter`].

mod json;
mod series;
mod text;

use std::path::Path;

use chrono::Utc;
use rolling_stats::Stats;
use serde::Serialize;

use crate::hrv::{PoincareDescriptors, descriptors};
use crate::processing::PipelineOutput;

pub use self::json::JsonFormatter;
pub use self::series::{
    lorenz_path, recording_stem, rri_path, save_lorenz, save_rri, write_lorenz, write_rri,
};
pub use self::text::TextFormatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl StatsSummary {
    pub fn from_stats(stats: &Stats<f64>) -> Option<Self> {
        if stats.count == 0 {
            return None;
        }
        Some(Self {
            count: stats.count,
            mean: stats.mean,
            std_dev: stats.std_dev,
            min: stats.min,
            max: stats.max,
        })
    }

    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut stats: Stats<f64> = Stats::new();
        for &v in values {
            stats.update(v);
        }
        Self::from_stats(&stats)
    }
}

/// One line of the run summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingSummary {
    pub name: String,
    pub processed_at: String,
    /// Seconds of conditioned signal the detector saw
    pub analyzed_s: f64,
    pub beats: usize,
    /// RR interval statistics in seconds
    pub rri: Option<StatsSummary>,
    pub mean_heart_rate_bpm: Option<f64>,
    pub poincare: Option<PoincareDescriptors>,
    pub error: Option<String>,
}

impl RecordingSummary {
    pub fn from_output(name: &str, output: &PipelineOutput) -> Self {
        let rri = StatsSummary::from_values(&output.rri);
        Self {
            name: name.to_string(),
            processed_at: iso8601_timestamp(),
            analyzed_s: output.conditioned.duration(),
            beats: output.beats.len(),
            mean_heart_rate_bpm: rri.map(|s| 60.0 / s.mean),
            rri,
            poincare: descriptors(&output.lorenz),
            error: None,
        }
    }

    pub fn failed(name: &str, error: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            processed_at: iso8601_timestamp(),
            analyzed_s: 0.0,
            beats: 0,
            rri: None,
            mean_heart_rate_bpm: None,
            poincare: None,
            error: Some(error.to_string()),
        }
    }

    pub fn for_path(path: &Path, output: &PipelineOutput) -> Self {
        Self::from_output(&display_name(path), output)
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub trait Formatter: Send {
    fn format(&self, summaries: &[RecordingSummary]) -> String;
}

pub fn create_formatter(format: OutputFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose)),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
