use std::ops::{Add, Div, Sub};

use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// A 2-D point in whatever coordinate frame its container documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const ORIGIN: Point2 = Point2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn norm_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance(self, other: Point2) -> f32 {
        (self - other).norm_squared().sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point2 {
    type Output = Point2;

    fn add(self, rhs: Point2) -> Point2 {
        Point2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2 {
    type Output = Point2;

    fn sub(self, rhs: Point2) -> Point2 {
        Point2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Div<f32> for Point2 {
    type Output = Point2;

    fn div(self, rhs: f32) -> Point2 {
        Point2::new(self.x / rhs, self.y / rhs)
    }
}

/// Arithmetic mean of the points at `indices`, skipping any index past the end.
///
/// Returns `None` when no index resolves.
pub fn subset_mean(points: &[Point2], indices: &[usize]) -> Option<Point2> {
    let mut sum = Point2::ORIGIN;
    let mut count = 0usize;
    for &i in indices {
        if let Some(&p) = points.get(i) {
            sum = sum + p;
            count += 1;
        }
    }
    (count > 0).then(|| sum / count as f32)
}

/// Like [`subset_mean`], but every index must resolve.
pub fn subset_mean_strict(points: &[Point2], indices: &[usize]) -> Option<Point2> {
    if indices.is_empty() || indices.iter().any(|&i| i >= points.len()) {
        return None;
    }
    subset_mean(points, indices)
}

/// Axis convention applied when a detector result is mapped into pixel space.
///
/// The preview used while the user watches themselves is mirrored on both
/// axes; the enrollment path consumes the sensor orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Raw,
    Mirrored,
}

/// Face-mesh landmarks in frame-pixel space, addressed by mesh index.
///
/// Built once per detector callback and dropped when that cycle ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Point2>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Point2> {
        self.points.get(index).copied()
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }
}

/// One landmark detector callback, as delivered to the pipeline.
///
/// `landmarks` are normalized to the frame dimensions (`[0, 1]` on both axes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    pub landmarks: Vec<(f32, f32)>,
    pub frame_width: u32,
    pub frame_height: u32,
    #[serde(default)]
    pub timestamp_ms: u64,
    pub is_real: bool,
}

impl DetectionFrame {
    /// Denormalize the landmarks into pixel space using the given axis convention.
    pub fn to_landmark_set(&self, orientation: Orientation) -> Result<LandmarkSet, FrameError> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(FrameError::InvalidDimensions {
                width: self.frame_width,
                height: self.frame_height,
            });
        }
        let w = self.frame_width as f32;
        let h = self.frame_height as f32;

        let mut points = Vec::with_capacity(self.landmarks.len());
        for (i, &(nx, ny)) in self.landmarks.iter().enumerate() {
            let p = match orientation {
                Orientation::Raw => Point2::new(nx * w, ny * h),
                Orientation::Mirrored => Point2::new((1.0 - nx) * w, (1.0 - ny) * h),
            };
            if !p.is_finite() {
                return Err(FrameError::NonFiniteLandmark(i));
            }
            points.push(p);
        }
        Ok(LandmarkSet::new(points))
    }
}
