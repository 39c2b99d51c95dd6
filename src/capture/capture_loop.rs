//! Camera start-up and the per-camera capture thread.
//!
//! `launch` spawns one thread per camera. The thread first opens the source
//! and, if the session is still `Starting`, becomes the capture loop. The
//! caller waits at most the source's init timeout; if it gives up first, the
//! session is moved to `Stopped` and a late-opening source is released
//! instead of being run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::imageops;
use log::{error, info, trace, warn};

use crate::configuration::types::{CameraRole, CaptureConfig};
use crate::error_handling::types::{CameraError, CaptureError};
use crate::frame_source::adapter::{FrameSourceAdapter, OpenedSource};
use crate::frame_source::types::Frame;

use super::camera_session::{CameraSession, CameraState};
use super::failure_tracker::{FailureTracker, Verdict};
use super::processor::FrameProcessor;

#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Every `stride`-th frame goes to the processor.
    pub stride: u64,
    pub read_failure_limit: u32,
    pub error_limit: u32,
    pub failure_backoff: Duration,
}

impl LoopSettings {
    pub fn for_role(config: &CaptureConfig, role: CameraRole) -> Self {
        let stride = match role {
            CameraRole::Door => config.door_stride,
            CameraRole::Activity => config.activity_stride,
        };
        Self {
            stride: stride.max(1),
            read_failure_limit: config.read_failure_limit,
            error_limit: config.error_limit,
            failure_backoff: config.failure_backoff(),
        }
    }
}

/// Opens the session's source and starts its capture thread.
///
/// Returns once the first frame arrived, the source failed, or the init
/// timeout elapsed. On error the session is left `Stopped`.
pub fn launch(
    session: &Arc<CameraSession>,
    adapter: &FrameSourceAdapter,
    processor: FrameProcessor,
    settings: LoopSettings,
) -> Result<(), CameraError> {
    let camera_id = session.camera_id().to_string();
    let timeout = adapter.init_timeout(session.descriptor());
    info!(
        "[{}] Starting {} camera on {}",
        camera_id,
        session.role(),
        session.descriptor()
    );

    let (sender, receiver) = mpsc::channel();
    let worker = {
        let owned = Arc::clone(session);
        let adapter = adapter.clone();
        thread::Builder::new()
            .name(format!("camera-{}", camera_id))
            .spawn(move || open_and_run(owned, adapter, processor, settings, sender))
            .map_err(|e| {
                session.transition(CameraState::Starting, CameraState::Stopped);
                CameraError::Connection(CaptureError::IoError(e))
            })?
    };
    session.set_worker(worker);

    match receiver.recv_timeout(timeout) {
        Ok(Ok(())) => {
            info!("[{}] Camera started", camera_id);
            Ok(())
        }
        Ok(Err(e)) => {
            session.join_worker();
            error!("[{}] Camera start failed: {}", camera_id, e);
            Err(CameraError::Connection(e))
        }
        Err(RecvTimeoutError::Timeout) => {
            if session.transition(CameraState::Starting, CameraState::Stopped) {
                session.set_last_error("initialization timeout");
                warn!(
                    "[{}] Initialization timeout after {:.1}s",
                    camera_id,
                    timeout.as_secs_f64()
                );
                return Err(CameraError::InitTimeout { camera_id, timeout });
            }
            // the init thread resolved while the wait expired
            match receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(CameraError::Connection(e)),
                Err(_) if session.is_running() => Ok(()),
                Err(_) => Err(CameraError::InitTimeout { camera_id, timeout }),
            }
        }
        Err(RecvTimeoutError::Disconnected) => {
            session.transition(CameraState::Starting, CameraState::Stopped);
            error!("[{}] Initialization thread exited unexpectedly", camera_id);
            Err(CameraError::Connection(CaptureError::ConnectionError(
                "initialization thread exited".to_string(),
            )))
        }
    }
}

fn open_and_run(
    session: Arc<CameraSession>,
    adapter: FrameSourceAdapter,
    processor: FrameProcessor,
    settings: LoopSettings,
    started: mpsc::Sender<Result<(), CaptureError>>,
) {
    let opened = adapter.open_while(session.descriptor(), || {
        session.state() == CameraState::Starting
    });
    match opened {
        Ok(opened) => {
            if !session.transition(CameraState::Starting, CameraState::Running) {
                info!(
                    "[{}] Source opened after start was abandoned, releasing it",
                    session.camera_id()
                );
                let OpenedSource { mut source, .. } = opened;
                source.release();
                return;
            }
            let _ = started.send(Ok(()));
            run_capture_loop(&session, opened, processor, &settings);
        }
        Err(e) => {
            session.transition(CameraState::Starting, CameraState::Stopped);
            session.set_last_error(&e.to_string());
            let _ = started.send(Err(e));
        }
    }
}

/// Pulls frames until the session leaves `Running`, then releases the source.
pub fn run_capture_loop(
    session: &CameraSession,
    opened: OpenedSource,
    mut processor: FrameProcessor,
    settings: &LoopSettings,
) {
    let OpenedSource {
        mut source,
        first_frame,
    } = opened;
    let mut tracker = FailureTracker::new(settings.read_failure_limit, settings.error_limit);

    handle_frame(session, &mut processor, settings, first_frame);

    while session.is_running() {
        match source.grab() {
            Ok(Some(frame)) => {
                tracker.on_success();
                handle_frame(session, &mut processor, settings, frame);
            }
            Ok(None) | Err(CaptureError::StreamClosed) => {
                if tracker.on_read_failure() == Verdict::Stop {
                    session.auto_stop(&format!(
                        "{} consecutive failed reads",
                        tracker.read_failures()
                    ));
                    break;
                }
                thread::sleep(settings.failure_backoff);
            }
            Err(e) => {
                warn!("[{}] Capture error: {}", session.camera_id(), e);
                if tracker.on_error() == Verdict::Stop {
                    session.auto_stop(&format!("{} consecutive capture errors", tracker.errors()));
                    break;
                }
                thread::sleep(settings.failure_backoff);
            }
        }
    }

    source.release();
    info!(
        "[{}] Capture thread exited after {} frame(s)",
        session.camera_id(),
        session.frame_count()
    );
}

fn handle_frame(
    session: &CameraSession,
    processor: &mut FrameProcessor,
    settings: &LoopSettings,
    mut frame: Frame,
) {
    mirror(&mut frame);
    let frame = Arc::new(frame);
    let count = session.record_frame(Arc::clone(&frame));
    trace!("[{}] frame {}", session.camera_id(), count);

    if count % settings.stride != 0 {
        return;
    }
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| processor.process(session, &frame)));
    if outcome.is_err() {
        error!(
            "[{}] Analysis failed on frame {}, skipping this cycle",
            session.camera_id(),
            count
        );
    }
}

/// Horizontal flip for mirror-correct display.
pub fn mirror(frame: &mut Frame) {
    imageops::flip_horizontal_in_place(&mut frame.image);
}
