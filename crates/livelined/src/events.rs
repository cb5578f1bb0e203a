//! JSON-lines event stream standing in for the camera callback and UI controls.

use liveline_core::{DetectionFrame, Mode, PublishedState};
use serde::{Deserialize, Serialize};

use crate::engine::CalibrationReport;

/// One line of input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    /// A landmark detector result for one frame.
    Frame(DetectionFrame),
    SetMode { mode: Mode },
    SetCalibrating { enabled: bool },
    SetTracking { enabled: bool },
    BeginCalibration,
    EndCalibration,
    Reset,
    /// Store the collected pattern for `user` and start a fresh session.
    Enroll {
        user: String,
        #[serde(default = "default_label")]
        label: String,
    },
}

fn default_label() -> String {
    "default".to_string()
}

/// One line of output.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputEvent {
    State(PublishedState),
    Calibration(CalibrationReport),
    Enrolled {
        id: String,
        user: String,
        frames: usize,
    },
    EnrollRejected {
        user: String,
        frames: usize,
        required: usize,
    },
    EnrollFailed {
        user: String,
        frames: usize,
        error: String,
    },
}

pub fn parse_line(line: &str) -> Result<Option<InputEvent>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_event() {
        let line = r#"{"type":"frame","landmarks":[[0.5,0.5]],"frame_width":640,"frame_height":480,"timestamp_ms":12,"is_real":true}"#;
        let Some(InputEvent::Frame(frame)) = parse_line(line).unwrap() else {
            panic!("expected a frame event");
        };
        assert_eq!(frame.timestamp_ms, 12);
        assert_eq!(frame.landmarks.len(), 1);
        assert!(frame.is_real);
    }

    #[test]
    fn test_parse_control_events() {
        assert_eq!(
            parse_line(r#"{"type":"set_mode","mode":"calibrating"}"#).unwrap(),
            Some(InputEvent::SetMode {
                mode: Mode::Calibrating
            })
        );
        assert_eq!(
            parse_line(r#"{"type":"set_tracking","enabled":false}"#).unwrap(),
            Some(InputEvent::SetTracking { enabled: false })
        );
        assert_eq!(
            parse_line(r#"{"type":"reset"}"#).unwrap(),
            Some(InputEvent::Reset)
        );
        assert_eq!(
            parse_line(r#"{"type":"enroll","user":"alice"}"#).unwrap(),
            Some(InputEvent::Enroll {
                user: "alice".into(),
                label: "default".into()
            })
        );
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# recorded 2026-10-01").unwrap(), None);
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        assert!(parse_line(r#"{"type":"teleport"}"#).is_err());
        assert!(parse_line("not json").is_err());
    }

    #[test]
    fn test_state_output_is_tagged() {
        let json = serde_json::to_value(OutputEvent::State(PublishedState::default())).unwrap();
        assert_eq!(json["type"], "state");
        assert_eq!(json["mode"], "idle");
        assert_eq!(json["total_frames_collected"], 0);
    }
}
