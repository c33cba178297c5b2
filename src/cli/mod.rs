use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use chromaprep::dataset::OutputMode;

mod config;
mod info;
mod prepare;

/// chromaprep - Chromatogram Training-Set Preparation
#[derive(Parser)]
#[command(name = "chromaprep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Output mode for the prepare command.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ModeArg {
    /// Whole chromatograms with per-time-point labels
    WholeSequential,
    /// Whole chromatograms with per-sliding-window labels
    WholeWindowed,
    /// Overlapping fixed-width slices, one binary label each
    #[default]
    Subsection,
}

impl From<ModeArg> for OutputMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::WholeSequential => OutputMode::WholeSequential,
            ModeArg::WholeWindowed => OutputMode::WholeWindowed,
            ModeArg::Subsection => OutputMode::Subsection,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Produce a labeled dataset from an annotation CSV and a trace TSV
    Prepare {
        /// Manual-annotation export (comma-delimited)
        #[arg(value_name = "ANNOTATIONS")]
        annotations: PathBuf,

        /// Chromatogram trace export (tab-delimited)
        #[arg(value_name = "TRACES")]
        traces: PathBuf,

        /// Output dataset directory
        #[arg(value_name = "OUT_DIR")]
        out_dir: PathBuf,

        /// Output mode
        #[arg(short = 'm', long, value_enum)]
        mode: Option<ModeArg>,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Trace rows per group (short groups are zero-padded)
        #[arg(long)]
        max_traces: Option<usize>,

        /// Sliding-window width in time points
        #[arg(short = 'w', long)]
        subsection_width: Option<usize>,

        /// Offset between consecutive window starts
        #[arg(short = 's', long)]
        step_size: Option<usize>,

        /// Fraction of a group's positive points a window must capture
        #[arg(short = 'p', long)]
        positive_percentage: Option<f64>,
    },

    /// Display information about a produced dataset directory
    Info {
        /// Dataset directory path
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Prepare {
            annotations,
            traces,
            out_dir,
            mode,
            config,
            max_traces,
            subsection_width,
            step_size,
            positive_percentage,
        } => prepare::run(
            annotations,
            traces,
            out_dir,
            mode,
            config,
            max_traces,
            subsection_width,
            step_size,
            positive_percentage,
        ),
        Commands::Info { dir } => info::run(dir),
    }
}
