//! Enrollment pattern: normalized inter-landmark distance vectors.

use serde::{Deserialize, Serialize};

use crate::geometry::NormalizedLandmarks;

/// Distances for each catalog pair, in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternFrame(Vec<f32>);

impl PatternFrame {
    /// Compute one frame, or `None` if any pair references a missing landmark.
    pub fn compute(normalized: &NormalizedLandmarks, pairs: &[(usize, usize)]) -> Option<Self> {
        let mut distances = Vec::with_capacity(pairs.len());
        for &(a, b) in pairs {
            let (Some(p), Some(q)) = (normalized.get(a), normalized.get(b)) else {
                tracing::debug!(a, b, len = normalized.len(), "pattern: pair out of range");
                return None;
            };
            distances.push(p.distance(q));
        }
        Some(Self(distances))
    }

    /// Rebuild a frame from stored distances.
    pub fn from_distances(distances: Vec<f32>) -> Self {
        Self(distances)
    }

    pub fn distances(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

/// Append-only collection of pattern frames for one enrollment session.
///
/// Every stored frame has exactly `pairs.len()` distances. Gating on liveness
/// and head pose is the caller's job.
#[derive(Debug, Clone)]
pub struct PatternAccumulator {
    pairs: Vec<(usize, usize)>,
    frames: Vec<PatternFrame>,
}

impl PatternAccumulator {
    pub fn new(pairs: &[(usize, usize)]) -> Self {
        Self {
            pairs: pairs.to_vec(),
            frames: Vec::new(),
        }
    }

    /// Compute and append a frame. Returns whether one was appended.
    pub fn accumulate(&mut self, normalized: &NormalizedLandmarks) -> bool {
        match PatternFrame::compute(normalized, &self.pairs) {
            Some(frame) => {
                self.frames.push(frame);
                true
            }
            None => false,
        }
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn frames(&self) -> &[PatternFrame] {
        &self.frames
    }

    /// Number of frames collected so far.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Hand the collected frames to the caller, leaving the collection empty.
    pub fn take(&mut self) -> Vec<PatternFrame> {
        std::mem::take(&mut self.frames)
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
