//! # Label Derivation
//!
//! Turns a group's retention-time axis and its annotated peak boundary into
//! binary label vectors. Two policies exist, selected by the pipeline's
//! output mode:
//!
//! - **Point labels**: one label per time point, 1 inside the closed
//!   annotation interval.
//! - **Window labels**: one label per sliding window over the point-label
//!   vector, 1 when the window captures at least `positive_percentage` of
//!   the group's positive points, or when the window is entirely positive.
//!
//! The fully-positive override is kept exactly as the original labeling
//! behaved: a window of all 1s is positive even when the percentage
//! threshold alone would exclude it.

use serde::{Deserialize, Serialize};

use crate::annotations::RetentionWindow;

/// Sliding-window labeling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowParams {
    /// Width of each window in time points.
    pub subsection_width: usize,
    /// Offset between consecutive window starts.
    pub step_size: usize,
    /// Fraction of the group's positive points a window must capture to be
    /// labeled positive, in `[0, 1]`.
    pub positive_percentage: f64,
}

impl Default for WindowParams {
    fn default() -> Self {
        Self {
            subsection_width: 20,
            step_size: 1,
            positive_percentage: 1.0,
        }
    }
}

impl WindowParams {
    /// Number of windows produced over a point-label vector of length
    /// `points`: `floor((points - width) / step) + 1`, or 0 when the vector
    /// is shorter than one window.
    ///
    /// # Panics
    ///
    /// Panics when `step_size` is 0; the pipeline and CLI both reject such
    /// configurations before any labeling runs.
    pub fn window_count(&self, points: usize) -> usize {
        assert!(self.step_size >= 1, "step_size must be >= 1");
        if points < self.subsection_width {
            0
        } else {
            (points - self.subsection_width) / self.step_size + 1
        }
    }
}

/// Per-time-point binary labels: 1 iff the time falls inside the window.
/// Both boundaries are inclusive; the output length equals `times.len()`.
pub fn point_labels(times: &[f64], window: &RetentionWindow) -> Vec<u8> {
    times
        .iter()
        .map(|&time| u8::from(window.contains(time)))
        .collect()
}

/// Per-window binary labels derived from a point-label vector.
///
/// A window starting at offset `i` covers `point[i..i + width]` and is
/// labeled 1 when its positive count reaches `positive_percentage` of the
/// whole vector's positive count, or when every point in it is positive.
/// A vector with no positive points yields all-zero labels unless the
/// threshold is zero.
///
/// # Panics
///
/// Panics when `params.step_size` is 0 (see [`WindowParams::window_count`]).
pub fn window_labels(point: &[u8], params: &WindowParams) -> Vec<u8> {
    let total_positive = point.iter().filter(|&&label| label == 1).count();
    let mut labels = Vec::with_capacity(params.window_count(point.len()));

    let mut offset = 0;
    while offset + params.subsection_width <= point.len() {
        let window = &point[offset..offset + params.subsection_width];
        let positive_count = window.iter().filter(|&&label| label == 1).count();

        // A group with no positive points yields no positive windows unless
        // the threshold itself is zero. The float comparison alone would
        // accept every window (0.0 >= 0.0).
        let reaches_share = if total_positive == 0 {
            params.positive_percentage <= 0.0
        } else {
            positive_count as f64 >= params.positive_percentage * total_positive as f64
        };
        let fully_positive = positive_count == params.subsection_width;

        labels.push(u8::from(reaches_share || fully_positive));
        offset += params.step_size;
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_labels_closed_interval() {
        let window = RetentionWindow { start: 10.0, end: 20.0 };
        let times = [5.0, 10.0, 15.0, 20.0, 25.0];
        assert_eq!(point_labels(&times, &window), vec![0, 1, 1, 1, 0]);
    }

    #[test]
    fn test_point_labels_empty_window() {
        let times = [1.0, 2.0, 3.0];
        assert_eq!(point_labels(&times, &RetentionWindow::EMPTY), vec![0, 0, 0]);
    }

    #[test]
    fn test_window_labels_fully_positive_override() {
        // Point labels [0,1,1,1,0,0,1,1] with width 3, step 1, threshold
        // 1.0: only the all-ones window at offset 1 is positive.
        let point = [0, 1, 1, 1, 0, 0, 1, 1];
        let params = WindowParams {
            subsection_width: 3,
            step_size: 1,
            positive_percentage: 1.0,
        };

        assert_eq!(window_labels(&point, &params), vec![0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_window_labels_percentage_threshold() {
        // 4 positives total; threshold 0.5 needs >= 2 captured per window.
        let point = [0, 1, 1, 1, 1, 0, 0, 0];
        let params = WindowParams {
            subsection_width: 4,
            step_size: 2,
            positive_percentage: 0.5,
        };

        // Windows: [0,1,1,1] -> 3, [1,1,1,0] -> 3, [1,0,0,0] -> 1.
        assert_eq!(window_labels(&point, &params), vec![1, 1, 0]);
    }

    #[test]
    fn test_window_labels_zero_positive_zero_threshold() {
        // With no positives, a zero threshold labels every window 1.
        let point = [0, 0, 0, 0];
        let params = WindowParams {
            subsection_width: 2,
            step_size: 1,
            positive_percentage: 0.0,
        };

        assert_eq!(window_labels(&point, &params), vec![1, 1, 1]);
    }

    #[test]
    fn test_window_labels_zero_positive_strict_threshold() {
        // A strictly positive threshold with no true positives can never be
        // met, and no window can be fully positive: all labels are 0.
        let point = [0, 0, 0, 0];
        let params = WindowParams {
            subsection_width: 2,
            step_size: 1,
            positive_percentage: 0.5,
        };

        assert_eq!(window_labels(&point, &params), vec![0, 0, 0]);
    }

    #[test]
    fn test_window_count_matches_emission() {
        let params = WindowParams {
            subsection_width: 3,
            step_size: 2,
            positive_percentage: 1.0,
        };

        for points in 0..12 {
            let point = vec![0u8; points];
            assert_eq!(
                window_labels(&point, &params).len(),
                params.window_count(points),
                "points = {points}"
            );
        }
    }

    #[test]
    #[should_panic(expected = "step_size must be >= 1")]
    fn test_zero_step_size_panics() {
        let params = WindowParams {
            subsection_width: 2,
            step_size: 0,
            positive_percentage: 1.0,
        };
        params.window_count(5);
    }

    #[test]
    fn test_window_shorter_input_yields_no_labels() {
        let params = WindowParams::default();
        assert_eq!(window_labels(&[1, 1, 1], &params), Vec::<u8>::new());
    }
}
