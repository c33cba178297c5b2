//! # Group Segmenter
//!
//! Partitions the ordered stream of trace rows into groups, one group per
//! consecutive run of rows sharing a (sequence, charge) key, capped at
//! `max_traces` rows. The segmenter holds at most one live group at a time
//! and emits a padded [`ClosedGroup`] every time the key changes,
//! the cap is reached, or the input ends.
//!
//! Closed groups always hold exactly `max_traces` rows: groups that close
//! short are bottom-padded with zero vectors the same length as the group's
//! time axis. The time axis is fixed by the first row of the group and never
//! re-derived from later rows.

use ndarray::Array2;

use crate::trace::TraceRow;

/// Errors that can occur during group segmentation
#[derive(Debug, thiserror::Error)]
pub enum SegmenterError {
    /// A row in an open group does not match the group's time-axis length.
    /// This is an internal-invariant violation, not a recoverable condition.
    #[error(
        "trace length mismatch in group '{key}': time axis has {expected} points, row has {found}"
    )]
    TraceLengthMismatch {
        /// Artifact name of the offending group
        key: String,
        /// Time-axis length fixed at group open
        expected: usize,
        /// Intensity length of the offending row
        found: usize,
    },

    /// `max_traces` must be at least 1
    #[error("max_traces must be >= 1")]
    InvalidCapacity,
}

/// Identity of a group: one (sequence, charge) occurrence within one
/// replicate context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    /// Peptide sequence.
    pub sequence: String,
    /// Replicate identifier.
    pub replicate: String,
    /// Charge state.
    pub charge: String,
}

impl GroupKey {
    fn from_row(row: &TraceRow) -> Self {
        Self {
            sequence: row.sequence.clone(),
            replicate: row.replicate_id.clone(),
            charge: row.charge.clone(),
        }
    }

    /// Whether `row` belongs to this group. Replicate is not part of the
    /// comparison: a replicate change always comes with a sequence change in
    /// Skyline exports, and the original convention keys groups on
    /// (sequence, charge) only.
    fn matches(&self, row: &TraceRow) -> bool {
        self.sequence == row.sequence && self.charge == row.charge
    }

    /// Artifact base name for this group: `<sequence>_<replicate>_<charge>`.
    pub fn artifact_name(&self) -> String {
        format!("{}_{}_{}", self.sequence, self.replicate, self.charge)
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.artifact_name())
    }
}

/// A closed, padded group ready for labeling and persistence.
#[derive(Debug, Clone)]
pub struct ClosedGroup {
    /// Group identity.
    pub key: GroupKey,
    /// Retention-time axis of the group's first row (length `L`).
    pub time_axis: Vec<f64>,
    /// Intensity stack, shape `(max_traces, L)`; rows beyond
    /// `trace_count` are zero padding.
    pub traces: Array2<f32>,
    /// Number of real (unpadded) trace rows.
    pub trace_count: usize,
}

impl ClosedGroup {
    /// Number of time points on the group's axis.
    pub fn points(&self) -> usize {
        self.time_axis.len()
    }
}

#[derive(Debug)]
struct ActiveGroup {
    key: GroupKey,
    time_axis: Vec<f64>,
    traces: Vec<Vec<f32>>,
}

impl ActiveGroup {
    fn open(row: TraceRow) -> Self {
        Self {
            key: GroupKey::from_row(&row),
            time_axis: row.times,
            traces: vec![row.intensities],
        }
    }

    fn append(&mut self, row: TraceRow) -> Result<(), SegmenterError> {
        if row.intensities.len() != self.time_axis.len() {
            return Err(SegmenterError::TraceLengthMismatch {
                key: self.key.artifact_name(),
                expected: self.time_axis.len(),
                found: row.intensities.len(),
            });
        }

        self.traces.push(row.intensities);
        Ok(())
    }

    /// Pad to `max_traces` rows and build the final intensity stack.
    fn close(self, max_traces: usize) -> ClosedGroup {
        let points = self.time_axis.len();
        let trace_count = self.traces.len();

        let mut stack = Array2::<f32>::zeros((max_traces, points));
        for (i, trace) in self.traces.into_iter().enumerate() {
            for (j, value) in trace.into_iter().enumerate() {
                stack[[i, j]] = value;
            }
        }

        ClosedGroup {
            key: self.key,
            time_axis: self.time_axis,
            traces: stack,
            trace_count,
        }
    }
}

/// Streaming segmenter holding at most one live group.
#[derive(Debug)]
pub struct GroupSegmenter {
    max_traces: usize,
    active: Option<ActiveGroup>,
}

impl GroupSegmenter {
    /// Create a segmenter that caps groups at `max_traces` rows.
    pub fn new(max_traces: usize) -> Result<Self, SegmenterError> {
        if max_traces == 0 {
            return Err(SegmenterError::InvalidCapacity);
        }

        Ok(Self {
            max_traces,
            active: None,
        })
    }

    /// Group capacity this segmenter pads and caps to.
    pub fn max_traces(&self) -> usize {
        self.max_traces
    }

    /// Feed one trace row into the segmenter.
    ///
    /// Returns the previously active group, padded and closed, whenever the
    /// row's key differs from the active group's or the active group is at
    /// capacity. The incoming row then opens a fresh group seeded with its
    /// time axis.
    pub fn push(&mut self, row: TraceRow) -> Result<Option<ClosedGroup>, SegmenterError> {
        let accumulating = matches!(
            &self.active,
            Some(group) if group.key.matches(&row) && group.traces.len() < self.max_traces
        );

        if accumulating {
            if let Some(group) = self.active.as_mut() {
                group.append(row)?;
            }
            return Ok(None);
        }

        let closed = self
            .active
            .replace(ActiveGroup::open(row))
            .map(|group| group.close(self.max_traces));
        Ok(closed)
    }

    /// Close whatever group is active. Called at end of input, where no
    /// trailing row exists to force closure.
    pub fn flush(&mut self) -> Option<ClosedGroup> {
        self.active.take().map(|group| group.close(self.max_traces))
    }
}
