//! End-to-end behaviour of the frame pipeline on synthetic face meshes.

use liveline_core::catalog::{self, FACE_OVAL, FULL_MESH_LEN, MANDATORY_PAIRS};
use liveline_core::gaze::eye_offsets;
use liveline_core::geometry::normalize;
use liveline_core::landmarks::subset_mean;
use liveline_core::pose::eye_aspect_ratio;
use liveline_core::{DetectionFrame, FrameCoordinator, LandmarkSet, Mode, Orientation, Point2};
use proptest::prelude::*;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

/// A frontal face in frame-normalized coordinates.
///
/// `nose` shifts the nose tip away from the oval centroid; `iris` shifts both
/// irises inside their eye contours.
fn synthetic_face(nose: (f32, f32), iris: (f32, f32)) -> Vec<(f32, f32)> {
    let (cx, cy) = (0.5f32, 0.5f32);
    let mut pts: Vec<(f32, f32)> = (0..FULL_MESH_LEN)
        .map(|i| {
            let angle = i as f32 * 2.399_963;
            let r = 0.25 * (i as f32 / FULL_MESH_LEN as f32).sqrt();
            (cx + r * angle.cos(), cy + r * angle.sin())
        })
        .collect();

    for (k, &i) in FACE_OVAL.iter().enumerate() {
        let angle = k as f32 * std::f32::consts::TAU / FACE_OVAL.len() as f32;
        pts[i] = (cx + 0.3 * angle.cos(), cy + 0.3 * angle.sin());
    }

    let ring = |pts: &mut Vec<(f32, f32)>, indices: &[usize], center: (f32, f32), r: f32| {
        for (k, &i) in indices.iter().enumerate() {
            let angle = k as f32 * std::f32::consts::TAU / indices.len() as f32;
            pts[i] = (center.0 + r * angle.cos(), center.1 + r * angle.sin());
        }
    };
    // eye corners 33 and 263 sit at angle 0 of their rings, level with each other
    ring(&mut pts, &catalog::LEFT_EYE[..], (0.43, 0.42), 0.03);
    ring(&mut pts, &catalog::RIGHT_EYE[..], (0.57, 0.42), 0.03);

    ring(&mut pts, &catalog::LEFT_IRIS[1..], (0.43 + iris.0, 0.42 + iris.1), 0.01);
    ring(&mut pts, &catalog::RIGHT_IRIS[1..], (0.57 + iris.0, 0.42 + iris.1), 0.01);
    pts[catalog::LEFT_IRIS[0]] = (0.43 + iris.0, 0.42 + iris.1);
    pts[catalog::RIGHT_IRIS[0]] = (0.57 + iris.0, 0.42 + iris.1);

    pts[catalog::NOSE_TIP] = (cx + nose.0, cy + nose.1);
    pts
}

fn frame(landmarks: Vec<(f32, f32)>, is_real: bool, timestamp_ms: u64) -> DetectionFrame {
    DetectionFrame {
        landmarks,
        frame_width: WIDTH,
        frame_height: HEIGHT,
        timestamp_ms,
        is_real,
    }
}

#[test]
fn collapsed_mesh_yields_sentinel_pose_and_no_pattern() {
    let f = DetectionFrame {
        landmarks: vec![(10.0 / 640.0, 10.0 / 640.0); FULL_MESH_LEN],
        frame_width: 640,
        frame_height: 640,
        timestamp_ms: 1,
        is_real: true,
    };

    let raw = f.to_landmark_set(Orientation::Raw).unwrap();
    let n = normalize(&raw, &FACE_OVAL).unwrap();
    assert_eq!(n.centroid, Point2::new(10.0, 10.0));
    assert_eq!(n.scale, 0.0);
    assert!(n.landmarks.is_empty());

    let mut c = FrameCoordinator::default();
    let out = c.process(&f);
    assert!(out.accepted);
    assert!(!out.normalized);
    assert!(out.pose.is_none());
    assert!(!out.pattern_appended);

    let s = c.published();
    assert_eq!((s.pitch, s.yaw, s.roll), (0.0, 0.0, 0.0));
    assert!(!s.pose_known);
    assert_eq!(s.total_frames_collected, 0);
    assert!(c.pattern_collection().is_empty());
}

#[test]
fn five_stable_live_frames_build_five_pattern_frames() {
    let mut c = FrameCoordinator::default();
    let noses = [
        (0.0, 0.0),
        (0.003, 0.0),
        (-0.003, 0.002),
        (0.0, -0.003),
        (0.002, 0.002),
    ];
    for (t, &nose) in noses.iter().enumerate() {
        let out = c.process(&frame(synthetic_face(nose, (0.0, 0.0)), true, t as u64));
        assert!(out.pattern_appended, "frame {t} not appended: {out:?}");
        let s = c.published();
        assert!(s.pose_known);
        assert!(s.pitch.abs() <= 0.05, "pitch {}", s.pitch);
        assert!(s.yaw.abs() <= 0.05, "yaw {}", s.yaw);
        assert!(s.roll.abs() <= 0.05, "roll {}", s.roll);
        assert!(s.is_head_pose_stable);
    }

    assert_eq!(c.published().total_frames_collected, 5);
    assert_eq!(c.pattern_collection().len(), 5);
    for pf in c.pattern_collection() {
        assert_eq!(pf.len(), MANDATORY_PAIRS.len());
    }
}

#[test]
fn liveness_alternation_counts_rejections_exactly() {
    let mut c = FrameCoordinator::default();
    for i in 0..10u64 {
        c.process(&frame(synthetic_face((0.0, 0.0), (0.0, 0.0)), i % 2 == 1, i));
    }
    assert_eq!(c.published().rejected_frames, 5);
    assert_eq!(c.published().total_frames_collected, 5);

    // live but turned away: counted as neither
    c.process(&frame(synthetic_face((0.15, 0.0), (0.0, 0.0)), true, 10));
    assert!(!c.published().is_head_pose_stable);
    assert_eq!(c.published().rejected_frames, 5);
    assert_eq!(c.published().total_frames_collected, 5);
}

#[test]
fn rejected_frames_do_not_feed_calibration() {
    let mut c = FrameCoordinator::default();
    c.begin_calibration();
    for i in 0..4u64 {
        c.process(&frame(synthetic_face((0.0, 0.0), (0.0, 0.0)), i < 1, i));
    }
    assert_eq!(c.published().calibration_samples, 1);
    assert_eq!(c.published().rejected_frames, 3);
}

#[test]
fn calibration_uses_only_frames_with_resolved_irises() {
    let mut c = FrameCoordinator::default();
    c.begin_calibration();

    let mut expected_left = Vec::new();
    let mut expected_right = Vec::new();
    for i in 0..10u64 {
        let shift = (i as f32 * 0.001, -(i as f32) * 0.0005);
        let mut lm = synthetic_face((0.0, 0.0), shift);
        if i == 3 || i == 7 {
            lm.truncate(468);
        } else {
            let set = LandmarkSet::new(
                lm.iter()
                    .map(|&(x, y)| Point2::new(x * WIDTH as f32, y * HEIGHT as f32))
                    .collect(),
            );
            let n = normalize(&set, &FACE_OVAL).unwrap();
            let off = eye_offsets(&n.landmarks);
            expected_left.push(off.left.unwrap());
            expected_right.push(off.right.unwrap());
        }
        c.process(&frame(lm, true, i));
    }

    assert_eq!(c.calibrator().sample_count(), 8);
    assert_eq!(c.published().calibration_samples, 8);

    let baseline = c.end_calibration().expect("baseline from 8 samples");
    let all: Vec<usize> = (0..8).collect();
    let left_mean = subset_mean(&expected_left, &all).unwrap();
    let right_mean = subset_mean(&expected_right, &all).unwrap();
    assert!((baseline.left_mean - left_mean).norm_squared() < 1e-10);
    assert!((baseline.right_mean - right_mean).norm_squared() < 1e-10);
    assert_eq!(c.mode(), Mode::Idle);
    assert_eq!(c.published().baseline, Some(baseline));
}

#[test]
fn tracking_reports_deviation_from_baseline() {
    let mut c = FrameCoordinator::default();
    c.begin_calibration();
    for i in 0..3u64 {
        c.process(&frame(synthetic_face((0.0, 0.0), (0.0, 0.0)), true, i));
    }
    c.end_calibration().unwrap();

    c.set_tracking(true);
    c.process(&frame(synthetic_face((0.0, 0.0), (0.0, 0.0)), true, 3));
    let centred = c.published().gaze_vector.unwrap();
    assert!(centred.norm_squared() < 1e-10);

    c.process(&frame(synthetic_face((0.0, 0.0), (0.01, 0.0)), true, 4));
    let right = c.published().gaze_vector.unwrap();
    assert!(right.x > 0.0);

    // no iris refinement: previous vector retained
    let mut lm = synthetic_face((0.0, 0.0), (0.0, 0.0));
    lm.truncate(468);
    c.process(&frame(lm, true, 5));
    assert_eq!(c.published().gaze_vector, Some(right));
}

#[test]
fn reset_is_idempotent() {
    let mut c = FrameCoordinator::default();
    c.begin_calibration();
    for i in 0..4u64 {
        c.process(&frame(synthetic_face((0.0, 0.0), (0.0, 0.0)), i % 2 == 0, i));
    }
    c.end_calibration();
    c.set_tracking(true);

    c.reset_for_new_user();
    let once = c.published().clone();
    c.reset_for_new_user();

    assert_eq!(c.published(), &once);
    assert_eq!(once.total_frames_collected, 0);
    assert_eq!(once.rejected_frames, 0);
    assert!(once.baseline.is_none());
    assert_eq!(c.mode(), Mode::Idle);
    assert!(c.pattern_collection().is_empty());
    assert_eq!(c.calibrator().sample_count(), 0);
}

#[test]
fn take_pattern_drains_collection() {
    let mut c = FrameCoordinator::default();
    for i in 0..3u64 {
        c.process(&frame(synthetic_face((0.0, 0.0), (0.0, 0.0)), true, i));
    }
    let frames = c.take_pattern();
    assert_eq!(frames.len(), 3);
    assert_eq!(c.published().total_frames_collected, 0);
    assert!(c.pattern_collection().is_empty());
}

fn points_strategy() -> impl Strategy<Value = Vec<Point2>> {
    prop::collection::vec((-500.0f32..500.0, -500.0f32..500.0), 40..80)
        .prop_map(|v| v.into_iter().map(|(x, y)| Point2::new(x, y)).collect())
}

proptest! {
    #[test]
    fn normalized_oval_recenters_to_origin(points in points_strategy()) {
        let oval: Vec<usize> = (0..36).collect();
        let n = normalize(&LandmarkSet::new(points), &oval).unwrap();
        prop_assume!(!n.landmarks.is_empty());
        let c = subset_mean(n.landmarks.points(), &oval).unwrap();
        prop_assert!(c.x.abs() < 1e-3 && c.y.abs() < 1e-3, "centroid {:?}", c);
    }

    #[test]
    fn normalization_is_empty_or_finite(points in points_strategy()) {
        let oval: Vec<usize> = (0..36).collect();
        let n = normalize(&LandmarkSet::new(points), &oval).unwrap();
        if n.scale <= 1e-6 {
            prop_assert!(n.landmarks.is_empty());
        }
        prop_assert!(n.landmarks.points().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn collapsed_detector_mesh_is_empty(
        nx in 0.0f32..=1.0,
        ny in 0.0f32..=1.0,
        len in 36usize..=FULL_MESH_LEN,
    ) {
        let f = DetectionFrame {
            landmarks: vec![(nx, ny); len],
            frame_width: WIDTH,
            frame_height: HEIGHT,
            timestamp_ms: 0,
            is_real: true,
        };
        let raw = f.to_landmark_set(Orientation::Raw).unwrap();
        // indices past `len` are skipped; at least index 10 is in range
        let n = normalize(&raw, &FACE_OVAL).unwrap();
        prop_assert_eq!(n.scale, 0.0);
        prop_assert!(n.landmarks.is_empty());

        let mut c = FrameCoordinator::default();
        c.begin_calibration();
        let out = c.process(&f);
        prop_assert!(!out.normalized);
        prop_assert!(out.pose.is_none());
        prop_assert!(!out.calibration_sample);
        prop_assert!(!out.pattern_appended);
    }

    #[test]
    fn ear_is_scale_invariant(k in 0.1f32..50.0) {
        let base: Vec<Point2> = synthetic_face((0.0, 0.0), (0.0, 0.0))
            .into_iter()
            .map(|(x, y)| Point2::new(x * 640.0, y * 480.0))
            .collect();
        let scaled: Vec<Point2> = base.iter().map(|&p| Point2::new(p.x * k, p.y * k)).collect();
        let a = eye_aspect_ratio(&LandmarkSet::new(base));
        let b = eye_aspect_ratio(&LandmarkSet::new(scaled));
        prop_assert!(a > 0.0);
        prop_assert!((a - b).abs() <= 1e-4 * a.max(1.0), "{} vs {}", a, b);
    }
}
