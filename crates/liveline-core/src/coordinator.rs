//! Per-frame orchestration of the pipeline and its published state.
//!
//! A [`FrameCoordinator`] is one capture session: `new` → `process`* →
//! `reset_for_new_user`/drop. It is not `Sync`-shared; the host serializes
//! frames, mode changes and resets onto the one thread that owns it.

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::gaze::{eye_offsets, CalibrationBaseline, GazeCalibrator};
use crate::geometry::{normalize_with_epsilon, Normalization, DEGENERATE_SCALE};
use crate::landmarks::{DetectionFrame, Orientation, Point2};
use crate::liveness::LivenessGate;
use crate::pattern::{PatternAccumulator, PatternFrame};
use crate::pose::{estimate_head_pose, eye_aspect_ratio, HeadPose, DEFAULT_STABILITY_THRESHOLD};

/// Gaze phase of the session. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Idle,
    Calibrating,
    Tracking,
}

/// Tunables for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Per-axis bound (radians) for a stable head pose.
    pub stability_threshold: f32,
    /// Normalization scales at or below this are degenerate.
    pub degenerate_scale: f32,
    /// Axis convention for EAR, head pose and gaze.
    pub pose_orientation: Orientation,
    /// Axis convention for pattern frames.
    pub pattern_orientation: Orientation,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stability_threshold: DEFAULT_STABILITY_THRESHOLD,
            degenerate_scale: DEGENERATE_SCALE,
            pose_orientation: Orientation::Raw,
            pattern_orientation: Orientation::Mirrored,
        }
    }
}

/// Snapshot of every externally observable signal.
///
/// Replaced as a whole at the end of each cycle so readers never see a
/// partially updated composite.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublishedState {
    pub timestamp_ms: u64,
    pub mode: Mode,
    pub ear: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
    /// False when pitch/yaw/roll are the zero sentinel rather than a measurement.
    pub pose_known: bool,
    pub is_head_pose_stable: bool,
    pub gaze_vector: Option<Point2>,
    pub is_real: bool,
    pub total_frames_collected: usize,
    pub rejected_frames: u64,
    pub calibration_samples: usize,
    pub baseline: Option<CalibrationBaseline>,
}

/// What a single cycle did, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameOutcome {
    pub accepted: bool,
    pub normalized: bool,
    pub pose: Option<HeadPose>,
    pub calibration_sample: bool,
    pub gaze_updated: bool,
    pub pattern_appended: bool,
}

/// The per-frame state machine wiring normalizer, pose, gaze, liveness and
/// pattern accumulation together.
#[derive(Debug, Clone)]
pub struct FrameCoordinator {
    config: PipelineConfig,
    mode: Mode,
    gate: LivenessGate,
    gaze: GazeCalibrator,
    pattern: PatternAccumulator,
    published: PublishedState,
}

impl Default for FrameCoordinator {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl FrameCoordinator {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            mode: Mode::Idle,
            gate: LivenessGate::new(),
            gaze: GazeCalibrator::new(),
            pattern: PatternAccumulator::new(&catalog::MANDATORY_PAIRS),
            published: PublishedState::default(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            tracing::debug!(from = ?self.mode, to = ?mode, "mode change");
        }
        self.mode = mode;
        self.published.mode = mode;
    }

    /// Flag-style control: enabling calibration replaces any other mode,
    /// disabling it only has an effect while calibrating.
    pub fn set_calibrating(&mut self, enabled: bool) {
        self.toggle(Mode::Calibrating, enabled);
    }

    /// Flag-style control, see [`set_calibrating`](Self::set_calibrating).
    pub fn set_tracking(&mut self, enabled: bool) {
        self.toggle(Mode::Tracking, enabled);
    }

    fn toggle(&mut self, mode: Mode, enabled: bool) {
        if enabled {
            self.set_mode(mode);
        } else if self.mode == mode {
            self.set_mode(Mode::Idle);
        }
    }

    /// Drop earlier calibration samples and start collecting new ones.
    pub fn begin_calibration(&mut self) {
        self.gaze.begin();
        self.set_mode(Mode::Calibrating);
        self.published.calibration_samples = 0;
    }

    /// Compute the baseline from the collected samples and leave calibration.
    ///
    /// Returns `None` (and keeps the previous baseline) when no sample was
    /// collected; callers gate "calibration complete" on the sample counter.
    pub fn end_calibration(&mut self) -> Option<CalibrationBaseline> {
        let baseline = self.gaze.finish();
        if self.mode == Mode::Calibrating {
            self.set_mode(Mode::Idle);
        }
        self.published.baseline = self.gaze.baseline();
        baseline
    }

    /// Clear the pattern, calibration state, liveness counter and mode.
    ///
    /// Idempotent. The external landmark detector is not touched.
    pub fn reset_for_new_user(&mut self) {
        self.gate.reset();
        self.gaze.reset();
        self.pattern.clear();
        self.mode = Mode::Idle;
        self.published = PublishedState::default();
        tracing::info!("session reset for new user");
    }

    /// Run one detection result through the pipeline.
    pub fn process(&mut self, frame: &DetectionFrame) -> FrameOutcome {
        let accepted = self.gate.admit(frame.is_real);
        let mut outcome = FrameOutcome {
            accepted,
            ..FrameOutcome::default()
        };
        self.published.is_real = accepted;
        self.published.rejected_frames = self.gate.rejected_frames();

        let raw = match frame.to_landmark_set(self.config.pose_orientation) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(error = %e, timestamp_ms = frame.timestamp_ms, "frame skipped");
                return outcome;
            }
        };

        let Some(normalization) =
            normalize_with_epsilon(&raw, &catalog::FACE_OVAL, self.config.degenerate_scale)
        else {
            tracing::debug!(timestamp_ms = frame.timestamp_ms, "no usable face geometry");
            return outcome;
        };
        let normalized = &normalization.landmarks;
        outcome.normalized = !normalized.is_empty();

        let ear = eye_aspect_ratio(&raw);
        let pose = estimate_head_pose(normalized);
        outcome.pose = pose;
        // The zero sentinel passes the stability test; pattern frames are still
        // refused below whenever the normalized set is empty.
        let shown_pose = pose.unwrap_or_default();
        let stable = shown_pose.is_stable(self.config.stability_threshold);

        let offsets = eye_offsets(normalized);
        match self.mode {
            Mode::Calibrating => {
                outcome.calibration_sample = self.gaze.record_sample(&offsets, accepted);
            }
            Mode::Tracking => {
                outcome.gaze_updated = self.gaze.track(&offsets).is_some();
            }
            Mode::Idle => {}
        }

        if accepted && stable && outcome.normalized {
            outcome.pattern_appended = self.append_pattern(frame, &normalization);
        }

        self.published = PublishedState {
            timestamp_ms: frame.timestamp_ms,
            mode: self.mode,
            ear,
            pitch: shown_pose.pitch,
            yaw: shown_pose.yaw,
            roll: shown_pose.roll,
            pose_known: pose.is_some(),
            is_head_pose_stable: stable,
            gaze_vector: self.gaze.gaze(),
            is_real: accepted,
            total_frames_collected: self.pattern.len(),
            rejected_frames: self.gate.rejected_frames(),
            calibration_samples: self.gaze.sample_count(),
            baseline: self.gaze.baseline(),
        };
        outcome
    }

    fn append_pattern(&mut self, frame: &DetectionFrame, pose_norm: &Normalization) -> bool {
        if self.config.pattern_orientation == self.config.pose_orientation {
            return self.pattern.accumulate(&pose_norm.landmarks);
        }
        let Ok(set) = frame.to_landmark_set(self.config.pattern_orientation) else {
            return false;
        };
        match normalize_with_epsilon(&set, &catalog::FACE_OVAL, self.config.degenerate_scale) {
            Some(n) if !n.is_degenerate() => self.pattern.accumulate(&n.landmarks),
            _ => false,
        }
    }

    pub fn published(&self) -> &PublishedState {
        &self.published
    }

    pub fn pattern_collection(&self) -> &[PatternFrame] {
        self.pattern.frames()
    }

    /// Hand over the collected pattern at the end of an enrollment session.
    pub fn take_pattern(&mut self) -> Vec<PatternFrame> {
        let frames = self.pattern.take();
        self.published.total_frames_collected = 0;
        frames
    }

    pub fn calibrator(&self) -> &GazeCalibrator {
        &self.gaze
    }

    pub fn rejected_frames(&self) -> u64 {
        self.gate.rejected_frames()
    }
}
