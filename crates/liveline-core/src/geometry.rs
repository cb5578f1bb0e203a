//! Centroid-relative, scale-normalized landmark coordinates.
//!
//! The centroid is the mean of the face-oval contour; every landmark is
//! translated by it and divided by the root-mean-square radial distance of the
//! translated mesh. A collapsed mesh (scale at or below [`DEGENERATE_SCALE`])
//! yields an empty normalized set, never a division by zero.

use crate::landmarks::{LandmarkSet, Point2};

/// Scales at or below this are treated as degenerate geometry.
pub const DEGENERATE_SCALE: f32 = 1e-6;

/// Landmarks expressed in the pose-invariant frame, or empty when the cycle's
/// geometry was degenerate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedLandmarks {
    points: Vec<Point2>,
}

impl NormalizedLandmarks {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// An empty set means "no usable frame", not zero displacement.
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

/// Output of one normalization pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    pub centroid: Point2,
    pub scale: f32,
    pub landmarks: NormalizedLandmarks,
}

impl Normalization {
    pub fn is_degenerate(&self) -> bool {
        self.landmarks.is_empty()
    }
}

/// Normalize `landmarks` against the centroid of the `oval` subset.
///
/// Returns `None` when the centroid is undefined (empty input, or no oval index
/// in range).
pub fn normalize(landmarks: &LandmarkSet, oval: &[usize]) -> Option<Normalization> {
    normalize_with_epsilon(landmarks, oval, DEGENERATE_SCALE)
}

/// Mean of the in-range `oval` points, in f64.
fn oval_centroid(points: &[Point2], oval: &[usize]) -> Option<(f64, f64)> {
    let mut sum = (0.0f64, 0.0f64);
    let mut count = 0usize;
    for p in oval.iter().filter_map(|&i| points.get(i)) {
        sum.0 += f64::from(p.x);
        sum.1 += f64::from(p.y);
        count += 1;
    }
    (count > 0).then(|| (sum.0 / count as f64, sum.1 / count as f64))
}

pub fn normalize_with_epsilon(
    landmarks: &LandmarkSet,
    oval: &[usize],
    epsilon: f32,
) -> Option<Normalization> {
    if landmarks.is_empty() {
        tracing::debug!("normalize: empty landmark set");
        return None;
    }
    let Some((cx, cy)) = oval_centroid(landmarks.points(), oval) else {
        tracing::debug!(
            landmarks = landmarks.len(),
            "normalize: no face-oval index in range"
        );
        return None;
    };
    let centroid = Point2::new(cx as f32, cy as f32);

    // Accumulated in f64: a collapsed mesh must translate to exactly zero.
    let translated: Vec<(f64, f64)> = landmarks
        .points()
        .iter()
        .map(|p| (f64::from(p.x) - cx, f64::from(p.y) - cy))
        .collect();
    let mean_sq = translated.iter().map(|(x, y)| x * x + y * y).sum::<f64>()
        / translated.len() as f64;
    let scale64 = mean_sq.max(0.0).sqrt();
    let scale = scale64 as f32;

    let points = if scale64 <= f64::from(epsilon) {
        tracing::debug!(scale, "normalize: degenerate geometry");
        Vec::new()
    } else {
        translated
            .into_iter()
            .map(|(x, y)| Point2::new((x / scale64) as f32, (y / scale64) as f32))
            .collect()
    };

    Some(Normalization {
        centroid,
        scale,
        landmarks: NormalizedLandmarks { points },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FACE_OVAL;

    fn set(points: &[(f32, f32)]) -> LandmarkSet {
        LandmarkSet::new(points.iter().map(|&(x, y)| Point2::new(x, y)).collect())
    }

    #[test]
    fn test_empty_set_has_no_normalization() {
        assert!(normalize(&LandmarkSet::default(), &FACE_OVAL).is_none());
    }

    #[test]
    fn test_oval_out_of_range_has_no_normalization() {
        let lm = set(&[(1.0, 1.0), (2.0, 2.0)]);
        assert!(normalize(&lm, &[10, 11]).is_none());
    }

    #[test]
    fn test_square_normalizes_to_unit_rms() {
        let lm = set(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
        let n = normalize(&lm, &[0, 1, 2, 3]).unwrap();
        assert_eq!(n.centroid, Point2::new(1.0, 1.0));
        assert!((n.scale - 2f32.sqrt()).abs() < 1e-6);
        let rms = (n.landmarks.points().iter().map(|p| p.norm_squared()).sum::<f32>()
            / n.landmarks.len() as f32)
            .sqrt();
        assert!((rms - 1.0).abs() < 1e-5);
        let first = n.landmarks.get(0).unwrap();
        assert!((first.x + 1.0 / 2f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_centroid_uses_only_oval_subset() {
        let lm = set(&[(0.0, 0.0), (4.0, 0.0), (100.0, 100.0)]);
        let n = normalize(&lm, &[0, 1]).unwrap();
        assert_eq!(n.centroid, Point2::new(2.0, 0.0));
        assert_eq!(n.landmarks.len(), 3);
    }

    #[test]
    fn test_collapsed_mesh_is_empty() {
        let lm = set(&[(10.0, 10.0); 500]);
        let n = normalize(&lm, &FACE_OVAL).unwrap();
        assert_eq!(n.centroid, Point2::new(10.0, 10.0));
        assert_eq!(n.scale, 0.0);
        assert!(n.is_degenerate());
    }

    #[test]
    fn test_collapsed_mesh_with_inexact_coordinates_is_empty() {
        // 0.337 * 640 and 0.611 * 480 are not exactly representable; their f32
        // sum over the oval does not divide back to the same value.
        for &(nx, ny) in &[(0.337f32, 0.611f32), (0.41, 0.53), (0.523, 0.377)] {
            let p = Point2::new(nx * 640.0, ny * 480.0);
            let n = normalize(&LandmarkSet::new(vec![p; 478]), &FACE_OVAL).unwrap();
            assert_eq!(n.scale, 0.0, "({nx}, {ny})");
            assert!(n.is_degenerate());
        }
    }

    #[test]
    fn test_tiny_scale_is_empty() {
        let lm = set(&[(0.0, 0.0), (1e-7, 0.0)]);
        let n = normalize(&lm, &[0, 1]).unwrap();
        assert!(n.scale <= DEGENERATE_SCALE);
        assert!(n.landmarks.is_empty());
    }
}
