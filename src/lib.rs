//! # chromaprep - Chromatogram Training-Set Preparation
//!
//! `chromaprep` ingests Skyline-style mass-spectrometry chromatogram exports
//! (one row per detector trace) together with manual peak-boundary
//! annotations, and produces labeled numeric samples for downstream model
//! training.
//!
//! ## Key Behaviors
//!
//! - **Streaming grouping**: the trace export is read once, row by row;
//!   consecutive rows sharing a (sequence, charge) key form a group, capped
//!   at `max_traces` rows and zero-padded to exactly that count.
//!
//! - **Deterministic labeling**: point labels mark time points inside the
//!   annotated retention window (closed interval); window labels apply a
//!   sliding-window positivity rule with a fully-positive override.
//!
//! - **Three output modes** sharing one pipeline: whole chromatograms with
//!   per-point labels, whole chromatograms with per-window labels, or
//!   materialized overlapping subsections each carrying one binary label.
//!
//! - **Binary output contract**: `.npy` arrays keyed by sample filename, a
//!   `chromatograms.csv` manifest with dense zero-based ids, and (for whole
//!   modes) a `labels.npz` archive, all loadable from NumPy without this
//!   crate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chromaprep::dataset::OutputMode;
//! use chromaprep::labels::WindowParams;
//! use chromaprep::pipeline::{self, PipelineConfig};
//!
//! let config = PipelineConfig {
//!     mode: OutputMode::Subsection,
//!     max_traces: 6,
//!     window: WindowParams {
//!         subsection_width: 20,
//!         step_size: 1,
//!         positive_percentage: 1.0,
//!     },
//! };
//!
//! let stats = pipeline::run(
//!     "annotations.csv",
//!     "traces.tsv",
//!     "out_dataset",
//!     &config,
//! )?;
//! println!("{stats}");
//! # Ok::<(), chromaprep::pipeline::PipelineError>(())
//! ```
//!
//! This creates a directory:
//! ```text
//! out_dataset/
//! ├── <sequence>_<replicate>_<charge>_<i>_to_<j>.npy
//! ├── chromatograms.csv    # ID,Filename,Label
//! └── metadata.json        # run provenance
//! ```
//!
//! ## Input Formats
//!
//! | Input | Delimiter | Fields used (0-based) |
//! |-------|-----------|-----------------------|
//! | Annotation export | `,` | 2 replicate, 13 sequence, 15 start, 16 end |
//! | Trace export | tab | 0 filename, 1 sequence, 2 charge, 8 times, 9 intensities |
//!
//! Both files carry a header row (skipped). The `#N/A` sentinel on a trace
//! row's sequence drops the row; on an annotation boundary it maps to the
//! zero retention window. Every other malformed value aborts the run with
//! an error naming the offending line.
//!
//! ## Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`annotations`]: annotation-export parsing and the retention-window index
//! - [`trace`]: trace-export row parsing and replicate-id extraction
//! - [`segmenter`]: streaming (sequence, charge) group segmentation and padding
//! - [`labels`]: point-label and sliding-window-label derivation
//! - [`subsection`]: fixed-width overlapping slice materialization
//! - [`dataset`]: output bundle (arrays, manifest, labels, metadata sidecar)
//! - [`pipeline`]: single-pass orchestration and the group observer hook

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod annotations;
pub mod dataset;
pub mod labels;
pub mod pipeline;
pub mod segmenter;
pub mod subsection;
pub mod trace;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::annotations::{AnnotationError, AnnotationIndex, RetentionWindow};
    pub use crate::dataset::{DatasetError, DatasetStats, DatasetWriter, OutputMode};
    pub use crate::labels::{point_labels, window_labels, WindowParams};
    pub use crate::pipeline::{
        GroupEvent, GroupObserver, NoopObserver, PipelineConfig, PipelineError, PipelineStats,
    };
    pub use crate::segmenter::{ClosedGroup, GroupKey, GroupSegmenter, SegmenterError};
    pub use crate::subsection::{Subsection, SubsectionError, SubsectionMaterializer};
    pub use crate::trace::{parse_record, ParsedRow, TraceError, TraceRow};
}
