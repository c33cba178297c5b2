//! # Preparation Pipeline
//!
//! Single-pass orchestration of the whole preparation run: the annotation
//! index is built once, then the trace export is streamed row by row through
//! the parser and the group segmenter; every closed group is labeled and
//! persisted before the next one opens. The three output modes share the
//! entire pipeline and branch only at the emission step.
//!
//! The run is strictly sequential and deterministic: identical input and
//! configuration produce byte-identical manifests and label arrays. Any
//! parse failure, annotation miss, invariant violation, or write failure
//! aborts the run; partial output is never trustworthy.

use std::path::Path;

use log::{debug, info};

use crate::annotations::{AnnotationError, AnnotationIndex};
use crate::dataset::{DatasetError, DatasetStats, DatasetWriter, OutputMode};
use crate::labels::{point_labels, window_labels, WindowParams};
use crate::segmenter::{ClosedGroup, GroupSegmenter, SegmenterError};
use crate::subsection::{SubsectionError, SubsectionMaterializer};
use crate::trace::{parse_record, ParsedRow, TraceError};

/// Errors that can abort a pipeline run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Annotation file could not be parsed, or a lookup missed
    #[error("annotation error: {0}")]
    AnnotationError(#[from] AnnotationError),

    /// Trace export row could not be parsed
    #[error("trace error: {0}")]
    TraceError(#[from] TraceError),

    /// Group segmentation invariant violated
    #[error("segmenter error: {0}")]
    SegmenterError(#[from] SegmenterError),

    /// Subsection materialization invariant violated
    #[error("subsection error: {0}")]
    SubsectionError(#[from] SubsectionError),

    /// Dataset artifact could not be written
    #[error("dataset error: {0}")]
    DatasetError(#[from] DatasetError),

    /// I/O error reading an input file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed trace export structure
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Sliding-window configuration that cannot produce windows
    #[error("invalid window parameters: {0}")]
    InvalidWindowParams(&'static str),
}

/// Configuration of a preparation run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Output mode to produce.
    pub mode: OutputMode,
    /// Trace rows per group; short groups are zero-padded to this count.
    pub max_traces: usize,
    /// Sliding-window parameters (windowed and subsection modes).
    pub window: WindowParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::Subsection,
            max_traces: 6,
            window: WindowParams::default(),
        }
    }
}

impl PipelineConfig {
    fn window_for_metadata(&self) -> Option<WindowParams> {
        match self.mode {
            OutputMode::WholeSequential => None,
            OutputMode::WholeWindowed | OutputMode::Subsection => Some(self.window),
        }
    }
}

/// Snapshot of a closed group handed to the observer.
#[derive(Debug)]
pub struct GroupEvent<'a> {
    /// Zero-based ordinal of the group in emission order.
    pub ordinal: u64,
    /// The group that just closed.
    pub group: &'a ClosedGroup,
}

/// Per-closed-group callback, decoupled from the core transformation.
///
/// Implementations drive logging, metrics, or progress bars; the pipeline
/// itself never prints.
pub trait GroupObserver {
    /// Called after a group is closed and padded, before it is persisted.
    fn group_closed(&mut self, event: &GroupEvent<'_>);
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl GroupObserver for NoopObserver {
    fn group_closed(&mut self, _event: &GroupEvent<'_>) {}
}

/// Statistics from a completed pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Trace rows read from the export (excluding the header).
    pub rows_read: u64,
    /// Rows dropped for the `#N/A` sequence sentinel.
    pub rows_skipped: u64,
    /// Groups closed and persisted.
    pub groups_written: u64,
    /// Dataset-level counts (samples, label vectors).
    pub dataset: DatasetStats,
}

impl std::fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Read {} rows ({} skipped), closed {} groups: {}",
            self.rows_read, self.rows_skipped, self.groups_written, self.dataset
        )
    }
}

/// Run the preparation pipeline without an observer.
pub fn run(
    annotations_path: impl AsRef<Path>,
    traces_path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<PipelineStats, PipelineError> {
    run_with_observer(annotations_path, traces_path, out_dir, config, &mut NoopObserver)
}

/// Run the preparation pipeline, invoking `observer` for every closed group.
pub fn run_with_observer(
    annotations_path: impl AsRef<Path>,
    traces_path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    config: &PipelineConfig,
    observer: &mut dyn GroupObserver,
) -> Result<PipelineStats, PipelineError> {
    if config.window.step_size == 0 {
        return Err(PipelineError::InvalidWindowParams("step_size must be >= 1"));
    }
    if config.window.subsection_width == 0 {
        return Err(PipelineError::InvalidWindowParams(
            "subsection_width must be >= 1",
        ));
    }

    let annotations = AnnotationIndex::from_csv_file(annotations_path.as_ref())?;
    info!(
        "loaded {} annotation windows across {} replicates",
        annotations.window_count(),
        annotations.replicate_count()
    );

    let mut writer = DatasetWriter::create(
        out_dir.as_ref(),
        config.mode,
        config.max_traces,
        config.window_for_metadata(),
    )?;
    let mut segmenter = GroupSegmenter::new(config.max_traces)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .has_headers(true)
        .from_path(traces_path.as_ref())?;

    let mut stats = PipelineStats::default();

    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        stats.rows_read += 1;

        let row = match parse_record(&record, line)? {
            ParsedRow::Row(row) => row,
            ParsedRow::Skip => {
                stats.rows_skipped += 1;
                continue;
            }
        };

        if let Some(group) = segmenter.push(row)? {
            emit_group(&group, &annotations, &mut writer, config, observer, &mut stats)?;
        }
    }

    // No trailing sentinel row exists to force closure at end of input.
    if let Some(group) = segmenter.flush() {
        emit_group(&group, &annotations, &mut writer, config, observer, &mut stats)?;
    }

    stats.dataset = writer.finish()?;
    info!("{stats}");

    Ok(stats)
}

/// Label one closed group and persist it according to the output mode.
fn emit_group(
    group: &ClosedGroup,
    annotations: &AnnotationIndex,
    writer: &mut DatasetWriter,
    config: &PipelineConfig,
    observer: &mut dyn GroupObserver,
    stats: &mut PipelineStats,
) -> Result<(), PipelineError> {
    let ordinal = stats.groups_written;
    observer.group_closed(&GroupEvent { ordinal, group });
    debug!(
        "group {} '{}': {} traces over {} points",
        ordinal,
        group.key,
        group.trace_count,
        group.points()
    );

    let window = annotations.lookup(&group.key.replicate, &group.key.sequence)?;
    let point = point_labels(&group.time_axis, window);

    match writer.mode() {
        OutputMode::WholeSequential => {
            writer.write_whole(group, &point)?;
        }
        OutputMode::WholeWindowed => {
            let windowed = window_labels(&point, &config.window);
            writer.write_whole(group, &windowed)?;
        }
        OutputMode::Subsection => {
            let windowed = window_labels(&point, &config.window);
            let materializer = SubsectionMaterializer::new(
                group,
                &windowed,
                config.window.subsection_width,
                config.window.step_size,
            )?;
            for subsection in materializer {
                writer.write_subsection(&subsection)?;
            }
        }
    }

    stats.groups_written += 1;
    Ok(())
}
