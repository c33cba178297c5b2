//! # Annotation Index
//!
//! Parses a Skyline manual-validation export into a nested lookup of
//! `replicate -> sequence -> RetentionWindow`.
//!
//! The export is a comma-delimited table with a header row. Only four
//! positional fields matter here; the rest of the row is carried by Skyline
//! for its own bookkeeping and is ignored. Boundaries marked `#N/A` mean the
//! validator could not call a peak for that pair; they map to the zero
//! window rather than an error so the pair stays addressable downstream.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Missing-value sentinel used by Skyline exports.
pub const MISSING_VALUE: &str = "#N/A";

/// Positional field layout of the annotation export.
mod fields {
    /// Replicate identifier.
    pub const REPLICATE: usize = 2;
    /// Peptide sequence.
    pub const SEQUENCE: usize = 13;
    /// Peak boundary start (minutes).
    pub const START: usize = 15;
    /// Peak boundary end (minutes).
    pub const END: usize = 16;
    /// Minimum number of fields a data row must carry.
    pub const MIN_FIELDS: usize = END + 1;
}

/// Errors that can occur while building or querying the annotation index
#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    /// I/O error reading the annotation file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed CSV content
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// A data row is too short to carry the required fields
    #[error("annotation line {line}: expected at least {expected} fields, found {found}")]
    MissingFields {
        /// 1-based line number in the source file
        line: u64,
        /// Required field count
        expected: usize,
        /// Field count actually present
        found: usize,
    },

    /// A boundary field is neither numeric nor the `#N/A` sentinel
    #[error("annotation line {line}: invalid {boundary} boundary '{value}'")]
    InvalidBoundary {
        /// 1-based line number in the source file
        line: u64,
        /// Which boundary failed to parse (`"start"` or `"end"`)
        boundary: &'static str,
        /// Offending field content
        value: String,
    },

    /// No annotation exists for the requested (replicate, sequence) pair
    #[error("no annotation for replicate '{replicate}', sequence '{sequence}'")]
    NotFound {
        /// Replicate identifier that was queried
        replicate: String,
        /// Peptide sequence that was queried
        sequence: String,
    },
}

/// Manually annotated peak boundary for one (replicate, sequence) pair.
///
/// The zero window `(0.0, 0.0)` encodes "no usable annotation": the source
/// row was marked `#N/A` by the validator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetentionWindow {
    /// Window start time (minutes)
    pub start: f64,
    /// Window end time (minutes)
    pub end: f64,
}

impl RetentionWindow {
    /// The sentinel window substituted for `#N/A` boundaries.
    pub const EMPTY: Self = Self { start: 0.0, end: 0.0 };

    /// Whether `time` falls inside the window. Both boundaries are inclusive.
    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Immutable lookup of retention windows keyed by replicate and sequence.
///
/// Built once per run from the annotation export; keys are case-sensitive.
/// At most one window is kept per (replicate, sequence) pair; the first
/// occurrence wins and later duplicates are ignored.
#[derive(Debug, Default)]
pub struct AnnotationIndex {
    windows: HashMap<String, HashMap<String, RetentionWindow>>,
}

impl AnnotationIndex {
    /// Build the index from an annotation export on disk.
    pub fn from_csv_file<P: AsRef<Path>>(path: P) -> Result<Self, AnnotationError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Build the index from any reader yielding the comma-delimited export.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AnnotationError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b',')
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let mut windows: HashMap<String, HashMap<String, RetentionWindow>> = HashMap::new();

        for record in csv_reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            if record.len() < fields::MIN_FIELDS {
                return Err(AnnotationError::MissingFields {
                    line,
                    expected: fields::MIN_FIELDS,
                    found: record.len(),
                });
            }

            let replicate = &record[fields::REPLICATE];
            let sequence = &record[fields::SEQUENCE];
            let start = &record[fields::START];
            let end = &record[fields::END];

            let by_sequence = windows.entry(replicate.to_string()).or_default();
            if by_sequence.contains_key(sequence) {
                // First occurrence wins.
                continue;
            }

            let window = if start == MISSING_VALUE || end == MISSING_VALUE {
                RetentionWindow::EMPTY
            } else {
                RetentionWindow {
                    start: parse_boundary(start, "start", line)?,
                    end: parse_boundary(end, "end", line)?,
                }
            };

            by_sequence.insert(sequence.to_string(), window);
        }

        Ok(Self { windows })
    }

    /// Look up the window for a (replicate, sequence) pair.
    ///
    /// A miss is a hard error, not a recoverable default: without the
    /// annotation the group's labels cannot be computed and the run must
    /// abort rather than emit silently unlabeled data.
    pub fn lookup(&self, replicate: &str, sequence: &str) -> Result<&RetentionWindow, AnnotationError> {
        self.windows
            .get(replicate)
            .and_then(|by_sequence| by_sequence.get(sequence))
            .ok_or_else(|| AnnotationError::NotFound {
                replicate: replicate.to_string(),
                sequence: sequence.to_string(),
            })
    }

    /// Number of replicates present in the index.
    pub fn replicate_count(&self) -> usize {
        self.windows.len()
    }

    /// Total number of (replicate, sequence) windows in the index.
    pub fn window_count(&self) -> usize {
        self.windows.values().map(|by_sequence| by_sequence.len()).sum()
    }
}

fn parse_boundary(value: &str, boundary: &'static str, line: u64) -> Result<f64, AnnotationError> {
    value
        .parse::<f64>()
        .map_err(|_| AnnotationError::InvalidBoundary {
            line,
            boundary,
            value: value.to_string(),
        })
}
