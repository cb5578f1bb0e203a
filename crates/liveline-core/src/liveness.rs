//! Liveness gating of individual frames.
//!
//! The anti-spoofing classifier runs outside this crate and hands the pipeline
//! one boolean per frame. This module is the single chokepoint applying that
//! boolean: calibration-sample collection and pattern collection both consult
//! the verdict recorded here for the same cycle, so the baseline and the
//! enrollment pattern it stabilizes never see different liveness decisions.
//!
//! # Side Effects
//!
//! - **Accepted frame:** none.
//! - **Rejected frame:** the cumulative rejected-frame counter increases by one.
//!   Nothing else about the frame is retained.

/// Cumulative liveness filter for one capture session.
#[derive(Debug, Clone, Default)]
pub struct LivenessGate {
    rejected_frames: u64,
    last_verdict: bool,
}

impl LivenessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the classifier's verdict for the current frame and return it.
    pub fn admit(&mut self, is_real: bool) -> bool {
        if !is_real {
            self.rejected_frames += 1;
            tracing::trace!(rejected = self.rejected_frames, "liveness: frame rejected");
        }
        self.last_verdict = is_real;
        is_real
    }

    /// Verdict of the most recently admitted frame.
    pub fn is_real(&self) -> bool {
        self.last_verdict
    }

    pub fn rejected_frames(&self) -> u64 {
        self.rejected_frames
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
