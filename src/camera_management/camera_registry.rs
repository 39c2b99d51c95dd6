use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};

use crate::alerting::types::Alert;
use crate::capture::capture_loop::{launch, LoopSettings};
use crate::capture::{CameraSession, CameraState, FrameProcessor, PipelineServices};
use crate::collaborators::types::DailyAttendance;
use crate::configuration::config::{validate_camera, Config};
use crate::configuration::types::{BehaviorConfig, CameraConfig, CaptureConfig};
use crate::error_handling::types::CameraError;
use crate::frame_source::adapter::FrameSourceAdapter;
use crate::frame_source::types::{SharedFrame, SourceDescriptor};

use super::types::{
    CameraInfo, CameraListing, CameraStats, QuickStatus, SecuritySummary, SourceProbe,
};

/// The camera registry
///
/// Holds camera configurations and the live session of every started
/// camera. All methods are blocking; async callers should go through
/// `spawn_blocking`.
///
/// # Fields Overview
///
/// - `cameras`: configured cameras, keyed by id
/// - `sessions`: live or auto-stopped sessions, keyed by camera id
/// - `adapter`: opens frame sources
/// - `services`: recognition, attendance and clip collaborators shared by all cameras
pub struct CameraRegistry {
    cameras: RwLock<BTreeMap<String, CameraConfig>>,
    sessions: Mutex<HashMap<String, Arc<CameraSession>>>,
    adapter: FrameSourceAdapter,
    services: Arc<PipelineServices>,
    capture: CaptureConfig,
    behavior: BehaviorConfig,
    throttle: Duration,
    stream_fps: u32,
}

impl CameraRegistry {
    pub fn new(
        config: &Config,
        adapter: FrameSourceAdapter,
        services: Arc<PipelineServices>,
    ) -> Self {
        let cameras = config
            .cameras
            .iter()
            .map(|camera| (camera.camera_id.clone(), camera.clone()))
            .collect();
        Self {
            cameras: RwLock::new(cameras),
            sessions: Mutex::new(HashMap::new()),
            adapter,
            services,
            capture: config.capture.clone(),
            behavior: config.behavior.clone(),
            throttle: config.alerts.throttle(),
            stream_fps: config.server.stream_fps,
        }
    }

    pub fn stream_fps(&self) -> u32 {
        self.stream_fps
    }

    pub fn add(&self, camera: CameraConfig) -> Result<(), CameraError> {
        validate_camera(&camera)?;
        let mut cameras = self.cameras.write().unwrap_or_else(PoisonError::into_inner);
        if cameras.contains_key(&camera.camera_id) {
            return Err(CameraError::DuplicateCamera(camera.camera_id));
        }
        info!(
            "[{}] Camera added ({}, source {})",
            camera.camera_id, camera.role, camera.source
        );
        cameras.insert(camera.camera_id.clone(), camera);
        Ok(())
    }

    pub fn list(&self) -> Vec<CameraListing> {
        let cameras = self.cameras.read().unwrap_or_else(PoisonError::into_inner);
        cameras
            .values()
            .map(|config| CameraListing {
                is_active: self.is_active(&config.camera_id),
                config: config.clone(),
            })
            .collect()
    }

    fn config_of(&self, camera_id: &str) -> Result<CameraConfig, CameraError> {
        self.cameras
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(camera_id)
            .cloned()
            .ok_or_else(|| CameraError::NotConfigured(camera_id.to_string()))
    }

    fn session(&self, camera_id: &str) -> Option<Arc<CameraSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(camera_id)
            .cloned()
    }

    pub fn is_active(&self, camera_id: &str) -> bool {
        self.session(camera_id)
            .map_or(false, |session| session.is_running())
    }

    /// Starts capturing. Blocks until the source delivered its first frame
    /// or the init timeout elapsed.
    pub fn start(&self, camera_id: &str) -> Result<(), CameraError> {
        let config = self.config_of(camera_id)?;

        let session = {
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = sessions.get(camera_id) {
                if existing.state() != CameraState::Stopped {
                    return Err(CameraError::AlreadyRunning(camera_id.to_string()));
                }
                debug!("[{}] Replacing stopped session", camera_id);
                existing.join_worker();
            }
            let session = Arc::new(CameraSession::new(config, self.capture.history_capacity));
            sessions.insert(camera_id.to_string(), Arc::clone(&session));
            session
        };

        let processor = FrameProcessor::new(
            session.role(),
            &self.behavior,
            self.throttle,
            Arc::clone(&self.services),
        );
        let settings = LoopSettings::for_role(&self.capture, session.role());

        if let Err(e) = launch(&session, &self.adapter, processor, settings) {
            warn!("[{}] Start failed: {}", camera_id, e);
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            if sessions
                .get(camera_id)
                .map_or(false, |current| Arc::ptr_eq(current, &session))
            {
                sessions.remove(camera_id);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Stops a running camera and waits for its capture thread.
    pub fn stop(&self, camera_id: &str) -> Result<(), CameraError> {
        let session = self
            .session(camera_id)
            .filter(|session| session.request_stop())
            .ok_or_else(|| CameraError::NotRunning(camera_id.to_string()))?;
        session.join_worker();

        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if sessions
            .get(camera_id)
            .map_or(false, |current| Arc::ptr_eq(current, &session))
        {
            sessions.remove(camera_id);
        }
        info!(
            "[{}] Camera stopped after {} frame(s)",
            camera_id,
            session.frame_count()
        );
        Ok(())
    }

    /// Stops the camera if needed and forgets its configuration.
    pub fn delete(&self, camera_id: &str) -> Result<(), CameraError> {
        self.config_of(camera_id)?;
        let session = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(camera_id);
        if let Some(session) = session {
            session.request_stop();
            session.join_worker();
        }
        self.cameras
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(camera_id);
        info!("[{}] Camera deleted", camera_id);
        Ok(())
    }

    /// Latest frame of a running camera.
    pub fn get_frame(&self, camera_id: &str) -> Option<SharedFrame> {
        self.session(camera_id)
            .filter(|session| session.is_running())
            .and_then(|session| session.latest_frame())
    }

    /// Consuming read of the camera's pending alert.
    pub fn get_latest_alert(&self, camera_id: &str) -> Option<Alert> {
        self.session(camera_id)
            .and_then(|session| session.take_alert())
    }

    pub fn get_stats(&self, camera_id: &str) -> Result<CameraStats, CameraError> {
        let config = self.config_of(camera_id)?;
        let stats = self
            .session(camera_id)
            .filter(|session| session.state() != CameraState::Stopped)
            .map(|session| session.stats());

        Ok(match stats {
            Some(stats) => CameraStats {
                camera_id: stats.camera_id,
                role: stats.role,
                state: stats.state,
                running: stats.running,
                frame_count: stats.frame_count,
                buffer_size: stats.buffer_size,
                fps: self.stream_fps,
                last_error: stats.last_error,
            },
            None => CameraStats {
                camera_id: config.camera_id,
                role: config.role,
                state: CameraState::Stopped,
                running: false,
                frame_count: 0,
                buffer_size: 0,
                fps: 0,
                last_error: self
                    .session(camera_id)
                    .and_then(|session| session.last_error()),
            },
        })
    }

    pub fn info(&self, camera_id: &str) -> Result<CameraInfo, CameraError> {
        let config = self.config_of(camera_id)?;
        let running = self
            .session(camera_id)
            .filter(|session| session.is_running());
        Ok(CameraInfo {
            is_active: running.is_some(),
            frame_count: running.map_or(0, |session| session.frame_count()),
            camera_id: config.camera_id,
            name: config.name,
            location: config.location,
            role: config.role,
        })
    }

    pub fn quick_status(&self) -> QuickStatus {
        QuickStatus {
            active_count: self.active_count(),
            total_cameras: self
                .cameras
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            timestamp: Utc::now(),
        }
    }

    fn active_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|session| session.is_running())
            .count()
    }

    /// Drains the pending alert of every camera, newest first.
    pub fn recent_alerts(&self) -> Vec<Alert> {
        let sessions: Vec<Arc<CameraSession>> = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut alerts: Vec<Alert> = sessions
            .iter()
            .filter_map(|session| session.take_alert())
            .collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alerts
    }

    /// Same consuming semantics as `recent_alerts`.
    pub fn security_summary(&self) -> SecuritySummary {
        let alerts = self.recent_alerts();
        let active_cameras = self.active_count();
        SecuritySummary {
            summary: format!(
                "Security Status: {} cameras active, {} recent alerts",
                active_cameras,
                alerts.len()
            ),
            active_cameras,
            total_alerts: alerts.len(),
            timestamp: Utc::now(),
        }
    }

    /// Opens `source` once, reads one frame and releases it.
    pub fn probe_source(&self, source: &str) -> Result<SourceProbe, CameraError> {
        let descriptor = SourceDescriptor::parse(source);
        info!("Testing source {}", descriptor);
        let (width, height) = self.adapter.probe(&descriptor)?;
        Ok(SourceProbe {
            source: source.to_string(),
            width,
            height,
        })
    }

    pub fn attendance_today(&self, employee_id: &str) -> Option<DailyAttendance> {
        self.services.attendance.today(employee_id)
    }

    pub fn attendance_month(&self, employee_id: &str, year: i32, month: u32) -> Vec<DailyAttendance> {
        self.services.attendance.month(employee_id, year, month)
    }

    /// Stops every camera and joins all capture threads.
    pub fn stop_all(&self) {
        let sessions: Vec<Arc<CameraSession>> = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, session)| session)
            .collect();
        for session in &sessions {
            session.request_stop();
        }
        for session in &sessions {
            session.join_worker();
        }
        info!("Stopped {} camera session(s)", sessions.len());
    }
}
