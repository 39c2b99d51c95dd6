//! Per-camera shared state.
//!
//! The capture thread is the only writer of the frame slot, the rolling
//! history and the frame counter. Request handlers read through short
//! locks and never touch the buffers directly. The pending alert shares the
//! frame slot's mutex, so posting and consuming an alert cannot interleave.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;

use crate::alerting::types::Alert;
use crate::configuration::types::{CameraConfig, CameraRole};
use crate::frame_source::types::{SharedFrame, SourceDescriptor};

use super::frame_history::FrameHistory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraState {
    Stopped,
    Starting,
    Running,
}

impl CameraState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => CameraState::Starting,
            2 => CameraState::Running,
            _ => CameraState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            CameraState::Stopped => 0,
            CameraState::Starting => 1,
            CameraState::Running => 2,
        }
    }
}

#[derive(Default)]
struct SessionSlots {
    current_frame: Option<SharedFrame>,
    pending_alert: Option<Alert>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub camera_id: String,
    pub role: CameraRole,
    pub state: CameraState,
    pub running: bool,
    pub frame_count: u64,
    pub buffer_size: usize,
    pub started_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

pub struct CameraSession {
    config: CameraConfig,
    descriptor: SourceDescriptor,
    state: AtomicU8,
    auto_stops: AtomicU32,
    frame_count: AtomicU64,
    slots: Mutex<SessionSlots>,
    history: Mutex<FrameHistory>,
    started_at: DateTime<Utc>,
    last_error: Mutex<Option<String>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CameraSession {
    /// A session begins in `Starting`.
    pub fn new(config: CameraConfig, history_capacity: usize) -> Self {
        let descriptor = SourceDescriptor::parse(&config.source);
        Self {
            config,
            descriptor,
            state: AtomicU8::new(CameraState::Starting.as_u8()),
            auto_stops: AtomicU32::new(0),
            frame_count: AtomicU64::new(0),
            slots: Mutex::new(SessionSlots::default()),
            history: Mutex::new(FrameHistory::new(history_capacity)),
            started_at: Utc::now(),
            last_error: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    pub fn camera_id(&self) -> &str {
        &self.config.camera_id
    }

    pub fn role(&self) -> CameraRole {
        self.config.role
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> CameraState {
        CameraState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == CameraState::Running
    }

    /// Atomically moves `from` → `to`; false if the state was not `from`.
    pub(crate) fn transition(&self, from: CameraState, to: CameraState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Asks the capture thread to exit. Returns whether this call stopped it.
    pub fn request_stop(&self) -> bool {
        let stopped = self.transition(CameraState::Running, CameraState::Stopped)
            || self.transition(CameraState::Starting, CameraState::Stopped);
        if stopped {
            info!("[{}] Stop requested", self.camera_id());
        }
        stopped
    }

    /// Stop decided by the capture loop itself. Only the first call for a
    /// running session has any effect.
    pub(crate) fn auto_stop(&self, reason: &str) -> bool {
        if !self.transition(CameraState::Running, CameraState::Stopped) {
            return false;
        }
        self.auto_stops.fetch_add(1, Ordering::AcqRel);
        self.set_last_error(reason);
        warn!("[{}] Camera stopped: {}", self.camera_id(), reason);
        true
    }

    pub fn auto_stop_count(&self) -> u32 {
        self.auto_stops.load(Ordering::Acquire)
    }

    pub(crate) fn set_last_error(&self, reason: &str) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(reason.to_string());
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publishes a captured frame and returns the frame count before it.
    pub(crate) fn record_frame(&self, frame: SharedFrame) -> u64 {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SharedFrame::clone(&frame));
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current_frame = Some(frame);
        self.frame_count.fetch_add(1, Ordering::AcqRel)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Acquire)
    }

    pub fn latest_frame(&self) -> Option<SharedFrame> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current_frame
            .clone()
    }

    /// Puts `alert` in the mailbox, replacing any unread one.
    pub fn post_alert(&self, alert: Alert) -> Option<Alert> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending_alert
            .replace(alert)
    }

    /// Consuming read: a second call without a new alert returns `None`.
    pub fn take_alert(&self) -> Option<Alert> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending_alert
            .take()
    }

    pub fn history_snapshot(&self) -> Vec<SharedFrame> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    pub fn history_len(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn stats(&self) -> SessionStats {
        let state = self.state();
        SessionStats {
            camera_id: self.camera_id().to_string(),
            role: self.role(),
            state,
            running: state == CameraState::Running,
            frame_count: self.frame_count(),
            buffer_size: self.history_len(),
            started_at: self.started_at,
            last_error: self.last_error(),
        }
    }

    pub(crate) fn set_worker(&self, handle: JoinHandle<()>) {
        *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Waits for the capture thread to exit. Call after `request_stop`.
    pub fn join_worker(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("[{}] Capture thread panicked", self.camera_id());
            }
        }
    }
}
