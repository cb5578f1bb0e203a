use std::path::PathBuf;

use liveline_core::PipelineConfig;

/// Host configuration, loaded from environment variables.
pub struct Config {
    /// Path to the SQLite database holding enrollment patterns.
    pub db_path: PathBuf,
    /// Per-axis head pose bound (radians) for pattern collection.
    pub stability_threshold: f32,
    /// Depth of the engine request queue.
    pub queue_depth: usize,
    /// Calibration samples required before "calibration complete" is reported.
    pub min_calibration_samples: usize,
    /// Pattern frames required before an enrollment is stored.
    pub min_enroll_frames: usize,
}

impl Config {
    /// Load configuration from `LIVELINE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("liveline");

        let db_path = std::env::var("LIVELINE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("patterns.db"));

        Self {
            db_path,
            stability_threshold: env_f32(
                "LIVELINE_STABILITY_THRESHOLD",
                liveline_core::pose::DEFAULT_STABILITY_THRESHOLD,
            ),
            queue_depth: env_usize("LIVELINE_QUEUE_DEPTH", 4).max(1),
            min_calibration_samples: env_usize("LIVELINE_MIN_CALIBRATION_SAMPLES", 1).max(1),
            min_enroll_frames: env_usize("LIVELINE_MIN_ENROLL_FRAMES", 5).max(1),
        }
    }

    /// Pipeline tunables derived from this configuration.
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            stability_threshold: self.stability_threshold,
            ..PipelineConfig::default()
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
