use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use chromaprep::labels::WindowParams;
use chromaprep::pipeline::{self, GroupEvent, GroupObserver, PipelineConfig};

use super::config::Config;
use super::ModeArg;

/// Observer driving an indicatif spinner from closed-group events. The
/// group total is unknown up front, so this is a spinner rather than a bar.
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {pos} groups closed ({msg})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl GroupObserver for ProgressObserver {
    fn group_closed(&mut self, event: &GroupEvent<'_>) {
        self.bar.set_position(event.ordinal + 1);
        self.bar.set_message(event.group.key.artifact_name());
    }
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    annotations: PathBuf,
    traces: PathBuf,
    out_dir: PathBuf,
    mode: Option<ModeArg>,
    config_path: Option<PathBuf>,
    max_traces: Option<usize>,
    subsection_width: Option<usize>,
    step_size: Option<usize>,
    positive_percentage: Option<f64>,
) -> Result<()> {
    if !annotations.exists() {
        anyhow::bail!("Annotation file does not exist: {}", annotations.display());
    }
    if !traces.exists() {
        anyhow::bail!("Trace export does not exist: {}", traces.display());
    }

    let file_config = match &config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    // CLI flags win over the config file, which wins over defaults.
    let defaults = PipelineConfig::default();
    let config = PipelineConfig {
        mode: mode
            .map(Into::into)
            .or(file_config.prepare.mode)
            .unwrap_or(defaults.mode),
        max_traces: max_traces
            .or(file_config.prepare.max_traces)
            .unwrap_or(defaults.max_traces),
        window: WindowParams {
            subsection_width: subsection_width
                .or(file_config.prepare.subsection_width)
                .unwrap_or(defaults.window.subsection_width),
            step_size: step_size
                .or(file_config.prepare.step_size)
                .unwrap_or(defaults.window.step_size),
            positive_percentage: positive_percentage
                .or(file_config.prepare.positive_percentage)
                .unwrap_or(defaults.window.positive_percentage),
        },
    };

    if !(0.0..=1.0).contains(&config.window.positive_percentage) {
        anyhow::bail!(
            "positive_percentage must be in [0, 1], got {}",
            config.window.positive_percentage
        );
    }
    if config.window.step_size == 0 {
        anyhow::bail!("step_size must be >= 1");
    }
    if config.window.subsection_width == 0 {
        anyhow::bail!("subsection_width must be >= 1");
    }

    info!(
        "preparing {} dataset in {} (max_traces = {})",
        config.mode,
        out_dir.display(),
        config.max_traces
    );

    let mut observer = ProgressObserver::new();
    let result = pipeline::run_with_observer(&annotations, &traces, &out_dir, &config, &mut observer);
    observer.finish();

    let stats = result.context("Preparation run failed")?;
    println!("{stats}");

    Ok(())
}
