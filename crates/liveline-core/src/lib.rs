//! Real-time facial geometry pipeline for liveness-gated biometric enrollment.
//!
//! One detection result from the external face-mesh model drives one cycle:
//! landmarks are normalized into a pose-invariant frame ([`geometry`]), head
//! orientation and eye openness are derived ([`pose`]), a per-user gaze
//! baseline is calibrated or tracked ([`gaze`]), and frames that pass the
//! externally supplied liveness signal ([`liveness`]) while the head is held
//! still contribute a distance vector to the enrollment pattern ([`pattern`]).
//! [`coordinator`] sequences these per frame and owns the published state.

pub mod catalog;
pub mod coordinator;
pub mod error;
pub mod gaze;
pub mod geometry;
pub mod landmarks;
pub mod liveness;
pub mod pattern;
pub mod pose;

pub use coordinator::{FrameCoordinator, FrameOutcome, Mode, PipelineConfig, PublishedState};
pub use error::FrameError;
pub use gaze::{CalibrationBaseline, EyeOffsets, GazeCalibrator};
pub use geometry::{Normalization, NormalizedLandmarks};
pub use landmarks::{DetectionFrame, LandmarkSet, Orientation, Point2};
pub use liveness::LivenessGate;
pub use pattern::{PatternAccumulator, PatternFrame};
pub use pose::HeadPose;
