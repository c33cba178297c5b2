//! # Dataset Bundle Writer
//!
//! Owns the output directory of a pipeline run and writes the artifacts the
//! downstream loaders consume:
//!
//! ```text
//! out_dir/
//! ├── <sample>.npy        # one array per group or subsection
//! ├── chromatograms.csv   # manifest: ID,Filename[,Label]
//! ├── labels.npz          # whole modes only: one label vector per group
//! └── metadata.json       # run provenance (tool version, config, counts)
//! ```
//!
//! Sample ids are dense, zero-based, and assigned in emission order; they
//! are the sole join key between manifest rows and array files. All write
//! failures are fatal to the run.

use std::fs::File;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use ndarray_npy::{write_npy, NpzWriter, WriteNpyError, WriteNpzError};
use serde::{Deserialize, Serialize};

use crate::labels::WindowParams;
use crate::segmenter::ClosedGroup;
use crate::subsection::Subsection;

/// Manifest filename inside the output directory.
pub const MANIFEST_FILENAME: &str = "chromatograms.csv";
/// Label-archive filename inside the output directory (whole modes only).
pub const LABELS_FILENAME: &str = "labels.npz";
/// Run-metadata sidecar filename inside the output directory.
pub const METADATA_FILENAME: &str = "metadata.json";

/// Errors that can occur while writing dataset artifacts
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error writing the manifest table
    #[error("manifest error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error writing a `.npy` array artifact
    #[error("array write error: {0}")]
    NpyError(#[from] WriteNpyError),

    /// Error writing the `labels.npz` archive
    #[error("label archive error: {0}")]
    NpzError(#[from] WriteNpzError),

    /// Error serializing the metadata sidecar
    #[error("metadata serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Label vector length disagrees with the array being persisted.
    /// Internal-invariant violation; labels and arrays share one time axis.
    #[error("label length mismatch for '{name}': {labels} labels for {expected} rows")]
    LabelLengthMismatch {
        /// Artifact name being written
        name: String,
        /// Labels supplied
        labels: usize,
        /// Expected label count
        expected: usize,
    },

    /// A whole-group write was requested in subsection mode or vice versa
    #[error("operation not valid in {mode} mode")]
    ModeMismatch {
        /// Mode the writer was created with
        mode: OutputMode,
    },
}

/// Output mode of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Whole chromatograms with per-time-point labels, arrays transposed to
    /// `(L, max_traces)`.
    WholeSequential,
    /// Whole chromatograms with per-sliding-window labels, arrays
    /// `(max_traces, L)`.
    WholeWindowed,
    /// Materialized overlapping slices, each `(max_traces, width)` with a
    /// scalar label in the manifest.
    Subsection,
}

impl OutputMode {
    /// Whether manifest rows carry a label column.
    pub fn labeled_manifest(&self) -> bool {
        matches!(self, OutputMode::Subsection)
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutputMode::WholeSequential => "whole-sequential",
            OutputMode::WholeWindowed => "whole-windowed",
            OutputMode::Subsection => "subsection",
        };
        f.write_str(name)
    }
}

/// Statistics from a completed dataset write
#[derive(Debug, Clone, Default)]
pub struct DatasetStats {
    /// Array artifacts written (one per manifest row).
    pub samples_written: u64,
    /// Label vectors stored in `labels.npz` (whole modes only).
    pub label_vectors_written: u64,
}

impl std::fmt::Display for DatasetStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Wrote {} samples ({} label vectors)",
            self.samples_written, self.label_vectors_written
        )
    }
}

/// Streaming writer for one output dataset directory.
pub struct DatasetWriter {
    root: PathBuf,
    mode: OutputMode,
    max_traces: usize,
    window: Option<WindowParams>,
    manifest: csv::Writer<File>,
    labels: Vec<Array1<u8>>,
    next_sample_id: u64,
}

impl DatasetWriter {
    /// Create the output directory (if needed) and open a fresh manifest.
    ///
    /// `window` is recorded in the metadata sidecar and should be present
    /// for the windowed and subsection modes.
    pub fn create<P: AsRef<Path>>(
        root: P,
        mode: OutputMode,
        max_traces: usize,
        window: Option<WindowParams>,
    ) -> Result<Self, DatasetError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;

        let mut manifest = csv::Writer::from_path(root.join(MANIFEST_FILENAME))?;
        if mode.labeled_manifest() {
            manifest.write_record(["ID", "Filename", "Label"])?;
        } else {
            manifest.write_record(["ID", "Filename"])?;
        }

        Ok(Self {
            root,
            mode,
            max_traces,
            window,
            manifest,
            labels: Vec::new(),
            next_sample_id: 0,
        })
    }

    /// Mode this writer was created with.
    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Next sample id to be assigned.
    pub fn next_sample_id(&self) -> u64 {
        self.next_sample_id
    }

    /// Persist a whole group and queue its label vector for `labels.npz`.
    ///
    /// The array is transposed to `(L, max_traces)` in the sequential mode
    /// and written as `(max_traces, L)` in the windowed mode. Returns the
    /// sample id assigned to the group.
    pub fn write_whole(&mut self, group: &ClosedGroup, labels: &[u8]) -> Result<u64, DatasetError> {
        let name = group.key.artifact_name();

        let array: Array2<f32> = match self.mode {
            OutputMode::WholeSequential => {
                // One label per time point, one array row per time point.
                if labels.len() != group.points() {
                    return Err(DatasetError::LabelLengthMismatch {
                        name,
                        labels: labels.len(),
                        expected: group.points(),
                    });
                }
                group.traces.t().to_owned()
            }
            OutputMode::WholeWindowed => group.traces.clone(),
            OutputMode::Subsection => {
                return Err(DatasetError::ModeMismatch { mode: self.mode });
            }
        };

        write_npy(self.root.join(format!("{name}.npy")), &array)?;

        let id = self.next_sample_id;
        self.manifest.write_record([id.to_string(), name])?;
        self.labels.push(Array1::from(labels.to_vec()));
        self.next_sample_id += 1;

        Ok(id)
    }

    /// Persist one materialized subsection and its manifest row. Returns
    /// the sample id assigned to the slice.
    pub fn write_subsection(&mut self, subsection: &Subsection) -> Result<u64, DatasetError> {
        if !matches!(self.mode, OutputMode::Subsection) {
            return Err(DatasetError::ModeMismatch { mode: self.mode });
        }

        write_npy(
            self.root.join(format!("{}.npy", subsection.filename)),
            &subsection.array,
        )?;

        let id = self.next_sample_id;
        self.manifest.write_record([
            id.to_string(),
            subsection.filename.clone(),
            subsection.label.to_string(),
        ])?;
        self.next_sample_id += 1;

        Ok(id)
    }

    /// Flush the manifest, write `labels.npz` (whole modes) and the
    /// metadata sidecar, and return final statistics.
    pub fn finish(mut self) -> Result<DatasetStats, DatasetError> {
        self.manifest.flush()?;

        let label_vectors = self.labels.len() as u64;
        if !self.labels.is_empty() {
            let mut npz = NpzWriter::new(File::create(self.root.join(LABELS_FILENAME))?);
            for (id, vector) in self.labels.iter().enumerate() {
                // Zero-padded ids keep archive order stable under the
                // lexicographic entry sorting NumPy applies on load.
                npz.add_array(format!("{id:06}"), vector)?;
            }
            npz.finish()?;
        }

        let stats = DatasetStats {
            samples_written: self.next_sample_id,
            label_vectors_written: label_vectors,
        };

        let metadata = DatasetMetadata {
            format: "chromaprep-dataset",
            tool_version: env!("CARGO_PKG_VERSION"),
            created: chrono::Utc::now().to_rfc3339(),
            mode: self.mode,
            max_traces: self.max_traces,
            window: self.window,
            samples_written: stats.samples_written,
            label_vectors_written: stats.label_vectors_written,
        };
        let sidecar = File::create(self.root.join(METADATA_FILENAME))?;
        serde_json::to_writer_pretty(sidecar, &metadata)?;

        Ok(stats)
    }
}

/// Run provenance written to `metadata.json`.
#[derive(Debug, Serialize)]
struct DatasetMetadata {
    format: &'static str,
    tool_version: &'static str,
    created: String,
    mode: OutputMode,
    max_traces: usize,
    window: Option<WindowParams>,
    samples_written: u64,
    label_vectors_written: u64,
}
