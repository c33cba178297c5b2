//! # Subsection Materializer
//!
//! Slices a closed, padded group into fixed-width overlapping windows along
//! the time axis and yields each as an independent sample carrying a single
//! binary label. Slices are produced one at a time so the caller can persist
//! and drop them immediately; nothing is batched.

use ndarray::{s, Array2};

use crate::segmenter::ClosedGroup;

/// Errors that can occur while materializing subsections
#[derive(Debug, thiserror::Error)]
pub enum SubsectionError {
    /// The window-label vector does not cover the group's window count.
    /// This is an internal-invariant violation: labels and slices are
    /// derived from the same axis and must agree.
    #[error(
        "window label count mismatch for group '{key}': {labels} labels for {windows} windows"
    )]
    LabelCountMismatch {
        /// Artifact name of the offending group
        key: String,
        /// Labels supplied
        labels: usize,
        /// Windows the group produces
        windows: usize,
    },
}

/// One materialized slice of a group.
#[derive(Debug, Clone)]
pub struct Subsection {
    /// Artifact name: `<group>_<start>_to_<end>` with inclusive offsets.
    pub filename: String,
    /// Intensity slice, shape `(max_traces, subsection_width)`.
    pub array: Array2<f32>,
    /// Binary label of this slice.
    pub label: u8,
}

/// Iterator yielding a group's subsections in offset order.
#[derive(Debug)]
pub struct SubsectionMaterializer<'a> {
    group: &'a ClosedGroup,
    labels: &'a [u8],
    width: usize,
    step: usize,
    offset: usize,
    index: usize,
}

impl<'a> SubsectionMaterializer<'a> {
    /// Create a materializer over `group` with one label per window.
    ///
    /// `labels` must have exactly one entry per window the group produces
    /// (see [`WindowParams::window_count`](crate::labels::WindowParams::window_count)).
    pub fn new(
        group: &'a ClosedGroup,
        labels: &'a [u8],
        width: usize,
        step: usize,
    ) -> Result<Self, SubsectionError> {
        let points = group.points();
        let windows = if points < width {
            0
        } else {
            (points - width) / step + 1
        };

        if labels.len() != windows {
            return Err(SubsectionError::LabelCountMismatch {
                key: group.key.artifact_name(),
                labels: labels.len(),
                windows,
            });
        }

        Ok(Self {
            group,
            labels,
            width,
            step,
            offset: 0,
            index: 0,
        })
    }
}

impl Iterator for SubsectionMaterializer<'_> {
    type Item = Subsection;

    fn next(&mut self) -> Option<Subsection> {
        if self.offset + self.width > self.group.points() {
            return None;
        }

        let start = self.offset;
        let end = start + self.width;
        let array = self.group.traces.slice(s![.., start..end]).to_owned();
        let filename = format!("{}_{}_to_{}", self.group.key.artifact_name(), start, end - 1);
        let label = self.labels[self.index];

        self.offset += self.step;
        self.index += 1;

        Some(Subsection { filename, array, label })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::GroupKey;
    use ndarray::Array2;

    fn group(points: usize) -> ClosedGroup {
        let traces = Array2::from_shape_fn((6, points), |(i, j)| (i * points + j) as f32);
        ClosedGroup {
            key: GroupKey {
                sequence: "PEP".to_string(),
                replicate: "rep1".to_string(),
                charge: "2".to_string(),
            },
            time_axis: (0..points).map(|t| t as f64).collect(),
            traces,
            trace_count: 6,
        }
    }

    #[test]
    fn test_slices_and_names() {
        let group = group(5);
        let labels = [1, 0, 1];

        let subsections: Vec<Subsection> =
            SubsectionMaterializer::new(&group, &labels, 3, 1).unwrap().collect();

        assert_eq!(subsections.len(), 3);
        assert_eq!(subsections[0].filename, "PEP_rep1_2_0_to_2");
        assert_eq!(subsections[1].filename, "PEP_rep1_2_1_to_3");
        assert_eq!(subsections[2].filename, "PEP_rep1_2_2_to_4");
        assert_eq!(subsections[0].label, 1);
        assert_eq!(subsections[1].label, 0);

        // Each slice is (max_traces, width) and starts at its own offset.
        for (j, subsection) in subsections.iter().enumerate() {
            assert_eq!(subsection.array.dim(), (6, 3));
            assert_eq!(subsection.array[[0, 0]], group.traces[[0, j]]);
            assert_eq!(subsection.array[[5, 2]], group.traces[[5, j + 2]]);
        }
    }

    #[test]
    fn test_step_skips_offsets() {
        let group = group(7);
        let labels = [0, 0, 0];

        let subsections: Vec<Subsection> =
            SubsectionMaterializer::new(&group, &labels, 3, 2).unwrap().collect();

        assert_eq!(subsections.len(), 3);
        assert_eq!(subsections[0].filename, "PEP_rep1_2_0_to_2");
        assert_eq!(subsections[1].filename, "PEP_rep1_2_2_to_4");
        assert_eq!(subsections[2].filename, "PEP_rep1_2_4_to_6");
    }

    #[test]
    fn test_label_count_mismatch_rejected() {
        let group = group(5);
        let labels = [1, 0];

        let result = SubsectionMaterializer::new(&group, &labels, 3, 1);
        assert!(matches!(result, Err(SubsectionError::LabelCountMismatch { .. })));
    }

    #[test]
    fn test_group_shorter_than_width_yields_nothing() {
        let group = group(2);
        let labels: [u8; 0] = [];

        let subsections: Vec<Subsection> =
            SubsectionMaterializer::new(&group, &labels, 3, 1).unwrap().collect();
        assert!(subsections.is_empty());
    }
}
