//! End-of-run topology report.

use crate::{RunnerError, SimulationStats};
use clap::ValueEnum;
use rplsim_model::SimulationConfig;
use rplsim_protocol::NodeSnapshot;
use serde::Serialize;
use std::path::Path;

/// Serialization format of the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Json,
    Yaml,
}

/// Everything a renderer needs to draw the final DODAG.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Wall-clock time the report was produced (RFC 3339).
    pub generated_at: String,
    pub config: SimulationConfig,
    pub stats: SimulationStats,
    /// SHA-256 of the text record stream.
    pub digest: String,
    pub nodes: Vec<NodeSnapshot>,
}

impl RunReport {
    pub fn new(
        config: SimulationConfig,
        stats: SimulationStats,
        digest: String,
        nodes: Vec<NodeSnapshot>,
    ) -> Self {
        RunReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            config,
            stats,
            digest,
            nodes,
        }
    }

    /// Render the report.
    pub fn render(&self, format: ReportFormat) -> Result<String, RunnerError> {
        Ok(match format {
            ReportFormat::Json => serde_json::to_string_pretty(self)?,
            ReportFormat::Yaml => serde_yaml::to_string(self)?,
        })
    }

    /// Write the report to `path`.
    pub fn write_to(&self, path: &Path, format: ReportFormat) -> Result<(), RunnerError> {
        std::fs::write(path, self.render(format)?)?;
        Ok(())
    }
}
