//! Query result reports written to the output directory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, SiftError};

/// One ranked candidate in a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub rank: usize,
    pub id: String,
    pub name: String,
    pub resume_text: String,
    pub summary: String,
}

/// Everything a query produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub query: String,
    pub expanded_query: String,
    /// True when query expansion fell back to the raw query
    pub expansion_fallback: bool,
    pub result_limit: usize,
    pub candidates: Vec<RankedCandidate>,
}

impl QueryReport {
    pub fn new(query: impl Into<String>, expanded_query: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            query: query.into(),
            expanded_query: expanded_query.into(),
            expansion_fallback: false,
            result_limit: 0,
            candidates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(SiftError::InvalidConfigValue {
                path: "output.format".to_string(),
                message: format!("unknown report format '{}'", other),
            }),
        }
    }
}

/// Writes `resume_output_<YYYYmmdd_HHMMSS>.<ext>` files
pub struct ReportWriter {
    dir: PathBuf,
    format: ReportFormat,
}

impl ReportWriter {
    pub fn new(dir: PathBuf, format: ReportFormat) -> Self {
        Self { dir, format }
    }

    /// Write the report and return the file path
    pub fn write(&self, report: &QueryReport) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| SiftError::Io {
            source: e,
            context: format!("Failed to create output directory: {}", self.dir.display()),
        })?;

        let path = self.output_path(report);
        match self.format {
            ReportFormat::Json => write_json(&path, report)?,
            ReportFormat::Csv => write_csv(&path, report)?,
        }

        info!(
            "Wrote {} candidates to {}",
            report.candidates.len(),
            path.display()
        );
        Ok(path)
    }

    fn output_path(&self, report: &QueryReport) -> PathBuf {
        let stamp = report.generated_at.format("%Y%m%d_%H%M%S");
        let ext = self.format.extension();

        let path = self.dir.join(format!("resume_output_{}.{}", stamp, ext));
        if !path.exists() {
            return path;
        }
        // Same second as an earlier run
        let run = report.run_id.simple().to_string();
        self.dir
            .join(format!("resume_output_{}_{}.{}", stamp, &run[..8], ext))
    }
}

fn write_json(path: &Path, report: &QueryReport) -> Result<()> {
    let json = serde_json::to_vec_pretty(report).map_err(|e| SiftError::Json {
        source: e,
        context: "Failed to serialize report".to_string(),
    })?;
    std::fs::write(path, json).map_err(|e| SiftError::Io {
        source: e,
        context: format!("Failed to write report: {}", path.display()),
    })
}

fn write_csv(path: &Path, report: &QueryReport) -> Result<()> {
    let csv_error = |e: csv::Error| SiftError::Csv {
        source: e,
        context: format!("Failed to write report: {}", path.display()),
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer
        .write_record(["CandidateID", "Name", "ResumeText", "Summary"])
        .map_err(csv_error)?;
    for candidate in &report.candidates {
        writer
            .write_record([
                candidate.id.as_str(),
                candidate.name.as_str(),
                candidate.resume_text.as_str(),
                candidate.summary.as_str(),
            ])
            .map_err(csv_error)?;
    }
    writer.flush().map_err(|e| SiftError::Io {
        source: e,
        context: format!("Failed to flush report: {}", path.display()),
    })
}
