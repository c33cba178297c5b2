//! # Trace Row Parser
//!
//! Parses one record of the tab-delimited chromatogram export into a typed
//! [`TraceRow`]. Each row is one detector trace: a structured source
//! filename, the peptide sequence and charge it belongs to, and two
//! comma-joined lists of equal length carrying the retention-time axis and
//! the intensity values.
//!
//! The replicate identifier is not a field of its own; it is embedded in the
//! structured filename and recovered by a fixed positional convention. That
//! convention is the join key against the annotation export and must be
//! preserved bit-for-bit.

use crate::annotations::MISSING_VALUE;

/// Positional field layout of the trace export.
mod fields {
    /// Structured source filename with the embedded replicate id.
    pub const FILENAME: usize = 0;
    /// Peptide sequence (`#N/A` marks a row to skip).
    pub const SEQUENCE: usize = 1;
    /// Charge state.
    pub const CHARGE: usize = 2;
    /// Comma-joined retention times.
    pub const TIMES: usize = 8;
    /// Comma-joined intensities.
    pub const INTENSITIES: usize = 9;
    /// Minimum number of fields a data row must carry.
    pub const MIN_FIELDS: usize = INTENSITIES + 1;
}

/// Marker separating the two filename segments.
const SEGMENT_MARKER: char = '%';
/// Token separator inside the first filename segment.
const TOKEN_SEPARATOR: char = '_';
/// Index of the replicate token inside the first segment.
const REPLICATE_TOKEN: usize = 2;
/// Byte offset into the second segment's stem where the replicate suffix
/// starts. Offsets past the stem yield an empty suffix, matching the
/// original convention.
const SUFFIX_OFFSET: usize = 10;

/// Errors that can occur while parsing trace rows
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// Malformed CSV/TSV content
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// I/O error reading the trace export
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A data row is too short to carry the required fields
    #[error("trace line {line}: expected at least {expected} fields, found {found}")]
    MissingFields {
        /// 1-based line number in the source file
        line: u64,
        /// Required field count
        expected: usize,
        /// Field count actually present
        found: usize,
    },

    /// The structured filename does not follow the replicate-id convention
    #[error("trace line {line}: filename '{filename}' does not match the replicate-id pattern")]
    FilenamePattern {
        /// 1-based line number in the source file
        line: u64,
        /// Offending filename field
        filename: String,
    },

    /// A time or intensity entry failed to parse as a number
    #[error("trace line {line}: invalid {list} value '{value}'")]
    InvalidNumber {
        /// 1-based line number in the source file
        line: u64,
        /// Which list failed (`"time"` or `"intensity"`)
        list: &'static str,
        /// Offending entry
        value: String,
    },

    /// The time and intensity lists differ in length
    #[error("trace line {line}: {times} time points but {intensities} intensities")]
    LengthMismatch {
        /// 1-based line number in the source file
        line: u64,
        /// Time list length
        times: usize,
        /// Intensity list length
        intensities: usize,
    },
}

/// One parsed trace row from the chromatogram export.
#[derive(Debug, Clone)]
pub struct TraceRow {
    /// Replicate identifier recovered from the structured filename.
    pub replicate_id: String,
    /// Peptide sequence this trace belongs to.
    pub sequence: String,
    /// Charge state, kept as an opaque grouping token.
    pub charge: String,
    /// Retention-time axis (minutes), same length as `intensities`.
    pub times: Vec<f64>,
    /// Intensity values, same length as `times`.
    pub intensities: Vec<f32>,
}

/// Outcome of parsing a single record.
#[derive(Debug)]
pub enum ParsedRow {
    /// A usable trace row.
    Row(TraceRow),
    /// The row's sequence field was the `#N/A` sentinel; drop it.
    Skip,
}

/// Parse one record of the trace export.
///
/// `line` is the 1-based line number of the record in the source file and is
/// only used for error reporting.
pub fn parse_record(record: &csv::StringRecord, line: u64) -> Result<ParsedRow, TraceError> {
    if record.len() < fields::MIN_FIELDS {
        return Err(TraceError::MissingFields {
            line,
            expected: fields::MIN_FIELDS,
            found: record.len(),
        });
    }

    let sequence = &record[fields::SEQUENCE];
    if sequence == MISSING_VALUE {
        return Ok(ParsedRow::Skip);
    }

    let replicate_id = replicate_id_from_filename(&record[fields::FILENAME], line)?;
    let times = parse_float_list::<f64>(&record[fields::TIMES], "time", line)?;
    let intensities = parse_float_list::<f32>(&record[fields::INTENSITIES], "intensity", line)?;

    if times.len() != intensities.len() {
        return Err(TraceError::LengthMismatch {
            line,
            times: times.len(),
            intensities: intensities.len(),
        });
    }

    Ok(ParsedRow::Row(TraceRow {
        replicate_id,
        sequence: sequence.to_string(),
        charge: record[fields::CHARGE].to_string(),
        times,
        intensities,
    }))
}

/// Recover the replicate identifier from a structured filename field.
///
/// The filename has two `%`-separated segments. The id is the third
/// `_`-token of the first segment concatenated with the second segment's
/// stem (up to its first `.`) from byte offset 10 onward. Example:
/// `a_b_rep1%abcdefghij01.raw` yields `rep1` + `01` = `rep101`.
pub fn replicate_id_from_filename(filename: &str, line: u64) -> Result<String, TraceError> {
    let pattern_error = || TraceError::FilenamePattern {
        line,
        filename: filename.to_string(),
    };

    let mut segments = filename.split(SEGMENT_MARKER);
    let first = segments.next().ok_or_else(pattern_error)?;
    let second = segments.next().ok_or_else(pattern_error)?;

    let token = first
        .split(TOKEN_SEPARATOR)
        .nth(REPLICATE_TOKEN)
        .ok_or_else(pattern_error)?;

    // `split` always yields at least one element, so the stem is present
    // even when the segment carries no extension.
    let stem = second.split('.').next().unwrap_or("");
    let suffix = stem.get(SUFFIX_OFFSET..).unwrap_or("");

    Ok(format!("{token}{suffix}"))
}

fn parse_float_list<T: std::str::FromStr>(
    joined: &str,
    list: &'static str,
    line: u64,
) -> Result<Vec<T>, TraceError> {
    joined
        .split(',')
        .map(|value| {
            value.parse::<T>().map_err(|_| TraceError::InvalidNumber {
                line,
                list,
                value: value.to_string(),
            })
        })
        .collect()
}
