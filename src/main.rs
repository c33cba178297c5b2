//! # chromaprep
//!
//! Command-line tool turning Skyline chromatogram exports and manual
//! peak-boundary annotations into labeled training arrays.
//!
//! ## Usage
//!
//! ```bash
//! # Materialize labeled subsections
//! chromaprep prepare annotations.csv traces.tsv out/ --mode subsection
//!
//! # Whole chromatograms with per-window labels
//! chromaprep prepare annotations.csv traces.tsv out/ --mode whole-windowed
//!
//! # Inspect a produced dataset
//! chromaprep info out/
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
