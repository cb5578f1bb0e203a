//! Per-user gaze baseline calibration and live gaze tracking.
//!
//! While calibrating, the iris-to-eye offsets of each live frame are collected
//! into two parallel sample lists. Ending calibration reduces them to a
//! [`CalibrationBaseline`]. While tracking, the live gaze vector is the mean
//! deviation of both eyes' offsets from that baseline.

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::geometry::{NormalizedLandmarks, DEGENERATE_SCALE};
use crate::landmarks::{subset_mean_strict, Point2};

/// Mean iris offsets captured while the user held a centred gaze.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBaseline {
    pub left_mean: Point2,
    pub right_mean: Point2,
}

/// Iris position relative to its eye contour, for both eyes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeOffsets {
    pub left: Option<Point2>,
    pub right: Option<Point2>,
    /// Inter-eye distance, floored at [`DEGENERATE_SCALE`].
    pub face_scale: f32,
}

impl EyeOffsets {
    pub fn both(&self) -> Option<(Point2, Point2)> {
        self.left.zip(self.right)
    }
}

/// Compute both eyes' iris offsets from a normalized landmark set.
pub fn eye_offsets(normalized: &NormalizedLandmarks) -> EyeOffsets {
    let pts = normalized.points();
    let left_iris = subset_mean_strict(pts, &catalog::LEFT_IRIS);
    let right_iris = subset_mean_strict(pts, &catalog::RIGHT_IRIS);
    let left_eye = subset_mean_strict(pts, &catalog::LEFT_EYE);
    let right_eye = subset_mean_strict(pts, &catalog::RIGHT_EYE);

    let face_scale = match (left_eye, right_eye) {
        (Some(l), Some(r)) => l.distance(r).max(DEGENERATE_SCALE),
        _ => DEGENERATE_SCALE,
    };

    EyeOffsets {
        left: left_iris.zip(left_eye).map(|(iris, eye)| iris - eye),
        right: right_iris.zip(right_eye).map(|(iris, eye)| iris - eye),
        face_scale,
    }
}

fn mean(points: &[Point2]) -> Option<Point2> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Point2::ORIGIN, |acc, &p| acc + p);
    Some(sum / points.len() as f32)
}

/// Calibration sample lists, baseline, and the last published gaze vector.
#[derive(Debug, Clone, Default)]
pub struct GazeCalibrator {
    left_samples: Vec<Point2>,
    right_samples: Vec<Point2>,
    baseline: Option<CalibrationBaseline>,
    gaze: Option<Point2>,
}

impl GazeCalibrator {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn with_baseline(baseline: CalibrationBaseline) -> Self {
        Self {
            baseline: Some(baseline),
            ..Self::default()
        }
    }

    /// Discard collected samples ahead of a new calibration phase.
    ///
    /// The previous baseline stays in effect until a new one is computed.
    pub fn begin(&mut self) {
        self.left_samples.clear();
        self.right_samples.clear();
    }

    /// Append one sample pair when both offsets resolve and the frame is live.
    pub fn record_sample(&mut self, offsets: &EyeOffsets, is_real: bool) -> bool {
        if !is_real {
            return false;
        }
        let Some((left, right)) = offsets.both() else {
            return false;
        };
        self.left_samples.push(left);
        self.right_samples.push(right);
        true
    }

    /// Reduce the collected samples to a new baseline.
    ///
    /// With no samples the previous baseline is kept and `None` is returned.
    pub fn finish(&mut self) -> Option<CalibrationBaseline> {
        let (Some(left_mean), Some(right_mean)) =
            (mean(&self.left_samples), mean(&self.right_samples))
        else {
            tracing::warn!(
                left = self.left_samples.len(),
                right = self.right_samples.len(),
                "calibration ended without samples; baseline unchanged"
            );
            return None;
        };
        let baseline = CalibrationBaseline {
            left_mean,
            right_mean,
        };
        tracing::info!(
            samples = self.left_samples.len(),
            left_x = left_mean.x,
            left_y = left_mean.y,
            right_x = right_mean.x,
            right_y = right_mean.y,
            "calibration baseline computed"
        );
        self.baseline = Some(baseline);
        Some(baseline)
    }

    /// Update the live gaze vector from the current offsets.
    ///
    /// When an offset does not resolve, or no baseline exists yet, the previous
    /// vector is retained.
    pub fn track(&mut self, offsets: &EyeOffsets) -> Option<Point2> {
        let baseline = self.baseline?;
        let (left, right) = offsets.both()?;
        let diff_left = left - baseline.left_mean;
        let diff_right = right - baseline.right_mean;
        let gaze = (diff_left + diff_right) / 2.0;
        self.gaze = Some(gaze);
        Some(gaze)
    }

    pub fn sample_count(&self) -> usize {
        self.left_samples.len()
    }

    pub fn left_samples(&self) -> &[Point2] {
        &self.left_samples
    }

    pub fn right_samples(&self) -> &[Point2] {
        &self.right_samples
    }

    pub fn baseline(&self) -> Option<CalibrationBaseline> {
        self.baseline
    }

    pub fn gaze(&self) -> Option<Point2> {
        self.gaze
    }

    /// Forget samples, baseline and gaze.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
