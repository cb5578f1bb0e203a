use liveline_core::{
    CalibrationBaseline, DetectionFrame, FrameCoordinator, Mode, PatternFrame, PipelineConfig,
    PublishedState,
};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Result of an end-of-calibration request.
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationReport {
    /// Baseline in effect after the request (possibly the previous one).
    pub baseline: Option<CalibrationBaseline>,
    /// Samples collected during the phase that just ended.
    pub samples: usize,
    /// True only when a new baseline was computed from enough samples.
    pub complete: bool,
}

/// Messages sent to the engine thread. Frames, mode changes and resets share
/// one queue, so every request is applied between two whole cycles.
enum EngineRequest {
    Frame {
        frame: DetectionFrame,
        reply: oneshot::Sender<PublishedState>,
    },
    SetMode {
        mode: Mode,
    },
    SetCalibrating {
        enabled: bool,
    },
    SetTracking {
        enabled: bool,
    },
    BeginCalibration,
    EndCalibration {
        reply: oneshot::Sender<CalibrationReport>,
    },
    Reset,
    Snapshot {
        reply: oneshot::Sender<PublishedState>,
    },
    TakePattern {
        reply: oneshot::Sender<Vec<PatternFrame>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    async fn send(&self, req: EngineRequest) -> Result<(), EngineError> {
        self.tx.send(req).await.map_err(|_| EngineError::ChannelClosed)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> EngineRequest,
    ) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx)).await?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Run one detection result through the pipeline and wait for its
    /// published state. A caller awaiting this never has two frames in flight.
    pub async fn process_frame(&self, frame: DetectionFrame) -> Result<PublishedState, EngineError> {
        self.request(|reply| EngineRequest::Frame { frame, reply }).await
    }

    pub async fn set_mode(&self, mode: Mode) -> Result<(), EngineError> {
        self.send(EngineRequest::SetMode { mode }).await
    }

    pub async fn set_calibrating(&self, enabled: bool) -> Result<(), EngineError> {
        self.send(EngineRequest::SetCalibrating { enabled }).await
    }

    pub async fn set_tracking(&self, enabled: bool) -> Result<(), EngineError> {
        self.send(EngineRequest::SetTracking { enabled }).await
    }

    pub async fn begin_calibration(&self) -> Result<(), EngineError> {
        self.send(EngineRequest::BeginCalibration).await
    }

    pub async fn end_calibration(&self) -> Result<CalibrationReport, EngineError> {
        self.request(|reply| EngineRequest::EndCalibration { reply })
            .await
    }

    /// Queue a new-user reset behind any frames already submitted.
    pub async fn reset_for_new_user(&self) -> Result<(), EngineError> {
        self.send(EngineRequest::Reset).await
    }

    pub async fn snapshot(&self) -> Result<PublishedState, EngineError> {
        self.request(|reply| EngineRequest::Snapshot { reply }).await
    }

    /// Drain the collected pattern for storage.
    pub async fn take_pattern(&self) -> Result<Vec<PatternFrame>, EngineError> {
        self.request(|reply| EngineRequest::TakePattern { reply })
            .await
    }
}

/// Spawn the engine on a dedicated OS thread owning one [`FrameCoordinator`].
///
/// Every request that changes observable state is followed by one complete
/// [`PublishedState`] on the returned watch channel.
pub fn spawn_engine(
    pipeline: PipelineConfig,
    queue_depth: usize,
    min_calibration_samples: usize,
) -> Result<(EngineHandle, watch::Receiver<PublishedState>), EngineError> {
    let mut coordinator = FrameCoordinator::new(pipeline);
    let (publish_tx, publish_rx) = watch::channel(coordinator.published().clone());
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(queue_depth.max(1));

    std::thread::Builder::new()
        .name("liveline-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                let changed = match req {
                    EngineRequest::Frame { frame, reply } => {
                        let outcome = coordinator.process(&frame);
                        tracing::trace!(
                            timestamp_ms = frame.timestamp_ms,
                            accepted = outcome.accepted,
                            pattern = outcome.pattern_appended,
                            "frame processed"
                        );
                        publish_tx.send_replace(coordinator.published().clone());
                        let _ = reply.send(coordinator.published().clone());
                        false
                    }
                    EngineRequest::SetMode { mode } => {
                        coordinator.set_mode(mode);
                        true
                    }
                    EngineRequest::SetCalibrating { enabled } => {
                        coordinator.set_calibrating(enabled);
                        true
                    }
                    EngineRequest::SetTracking { enabled } => {
                        coordinator.set_tracking(enabled);
                        true
                    }
                    EngineRequest::BeginCalibration => {
                        coordinator.begin_calibration();
                        tracing::info!("calibration started");
                        true
                    }
                    EngineRequest::EndCalibration { reply } => {
                        let samples = coordinator.calibrator().sample_count();
                        let computed = coordinator.end_calibration();
                        let report = CalibrationReport {
                            baseline: coordinator.calibrator().baseline(),
                            samples,
                            complete: computed.is_some() && samples >= min_calibration_samples,
                        };
                        if !report.complete {
                            tracing::warn!(
                                samples,
                                required = min_calibration_samples,
                                "calibration incomplete"
                            );
                        }
                        let _ = reply.send(report);
                        true
                    }
                    EngineRequest::Reset => {
                        coordinator.reset_for_new_user();
                        true
                    }
                    EngineRequest::Snapshot { reply } => {
                        let _ = reply.send(coordinator.published().clone());
                        false
                    }
                    EngineRequest::TakePattern { reply } => {
                        let _ = reply.send(coordinator.take_pattern());
                        true
                    }
                };
                if changed {
                    publish_tx.send_replace(coordinator.published().clone());
                }
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok((EngineHandle { tx }, publish_rx))
}
