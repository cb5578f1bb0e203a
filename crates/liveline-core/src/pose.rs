//! Eye aspect ratio and head orientation.

use serde::{Deserialize, Serialize};

use crate::catalog::{self, EarLandmarks};
use crate::geometry::NormalizedLandmarks;
use crate::landmarks::LandmarkSet;

/// Default small-angle bound (radians) on every axis for a stable head pose.
pub const DEFAULT_STABILITY_THRESHOLD: f32 = 0.1;

/// Head orientation in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl HeadPose {
    pub fn is_stable(&self, threshold: f32) -> bool {
        self.pitch.abs() <= threshold && self.yaw.abs() <= threshold && self.roll.abs() <= threshold
    }
}

/// Mean eye aspect ratio of both eyes, from raw pixel-space landmarks.
///
/// Returns 0 when the set does not reach [`catalog::EAR_MAX_INDEX`]; that value
/// means "cannot compute", not "eyes closed".
pub fn eye_aspect_ratio(landmarks: &LandmarkSet) -> f32 {
    if landmarks.len() <= catalog::EAR_MAX_INDEX {
        return 0.0;
    }
    let left = single_eye_ratio(landmarks, &catalog::LEFT_EAR);
    let right = single_eye_ratio(landmarks, &catalog::RIGHT_EAR);
    (left + right) / 2.0
}

fn single_eye_ratio(landmarks: &LandmarkSet, eye: &EarLandmarks) -> f32 {
    let dist = |a: usize, b: usize| match (landmarks.get(a), landmarks.get(b)) {
        (Some(p), Some(q)) => p.distance(q),
        _ => 0.0,
    };
    let horizontal = dist(eye.corners.0, eye.corners.1);
    if horizontal == 0.0 {
        return 0.0;
    }
    let vertical_a = dist(eye.upper[0], eye.lower[0]);
    let vertical_b = dist(eye.upper[1], eye.lower[1]);
    (vertical_a + vertical_b) / (2.0 * horizontal)
}

/// Head pose from the normalized nose tip and the eye-corner line.
///
/// The nose tip is read as a point on a unit disk spanning the face's angular
/// extent. Returns `None` when any required landmark is missing, including a
/// degenerate (empty) normalized set.
pub fn estimate_head_pose(normalized: &NormalizedLandmarks) -> Option<HeadPose> {
    let nose = normalized.get(catalog::NOSE_TIP)?;
    let left_corner = normalized.get(catalog::LEFT_EYE_CORNER)?;
    let right_corner = normalized.get(catalog::RIGHT_EYE_CORNER)?;

    let den = (1.0 - nose.x * nose.x - nose.y * nose.y).max(0.0).sqrt();
    let eye_line = right_corner - left_corner;

    Some(HeadPose {
        pitch: nose.y.atan2(den),
        yaw: nose.x.atan2(den),
        roll: eye_line.y.atan2(eye_line.x),
    })
}
