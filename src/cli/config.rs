//! TOML configuration file support for repeatable runs.
//!
//! Instead of passing many CLI flags, users can specify settings in a config
//! file:
//!
//! ```toml
//! # chromaprep.toml
//! [prepare]
//! mode = "subsection"
//! max_traces = 6
//! subsection_width = 20
//! step_size = 1
//! positive_percentage = 1.0
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use chromaprep::dataset::OutputMode;

/// Root configuration structure for chromaprep.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Prepare-specific settings.
    #[serde(default)]
    pub prepare: PrepareConfig,
}

/// Configuration for the prepare command.
#[derive(Debug, Default, Deserialize)]
pub struct PrepareConfig {
    /// Output mode (`whole_sequential`, `whole_windowed`, `subsection`).
    pub mode: Option<OutputMode>,

    /// Trace rows per group.
    pub max_traces: Option<usize>,

    /// Sliding-window width in time points.
    pub subsection_width: Option<usize>,

    /// Offset between consecutive window starts.
    pub step_size: Option<usize>,

    /// Fraction of a group's positive points a window must capture.
    pub positive_percentage: Option<f64>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}
