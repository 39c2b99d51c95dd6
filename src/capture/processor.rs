//! Periodic analysis run from the capture thread on subsampled frames.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::alerting::throttle::AlertThrottle;
use crate::alerting::types::{Alert, AlertCategory};
use crate::archival::trigger::ClipTrigger;
use crate::behavior::BehaviorAnalyzer;
use crate::collaborators::traits::AttendanceRecorder;
use crate::configuration::types::{BehaviorConfig, CameraRole};
use crate::frame_source::types::SharedFrame;
use crate::recognition::adapter::RecognitionAdapter;

use super::camera_session::CameraSession;

/// Collaborators shared by every camera's processor.
pub struct PipelineServices {
    pub recognition: RecognitionAdapter,
    pub attendance: Arc<dyn AttendanceRecorder>,
    pub clips: Arc<ClipTrigger>,
}

/// Door cameras run recognition and attendance; activity cameras run the
/// behavior analyzer. Both deliver through the per-camera throttle into the
/// session mailbox and request a clip for every delivered alert.
pub struct FrameProcessor {
    role: CameraRole,
    analyzer: BehaviorAnalyzer,
    throttle: AlertThrottle,
    services: Arc<PipelineServices>,
}

impl FrameProcessor {
    pub fn new(
        role: CameraRole,
        behavior: &BehaviorConfig,
        throttle_window: Duration,
        services: Arc<PipelineServices>,
    ) -> Self {
        Self {
            role,
            analyzer: BehaviorAnalyzer::new(behavior),
            throttle: AlertThrottle::new(throttle_window),
            services,
        }
    }

    pub fn process(&mut self, session: &CameraSession, frame: &SharedFrame) {
        match self.role {
            CameraRole::Door => self.process_door(session, frame),
            CameraRole::Activity => self.process_activity(session, frame),
        }
    }

    fn process_door(&mut self, session: &CameraSession, frame: &SharedFrame) {
        let camera_id = session.camera_id();
        let Some(recognized) = self.services.recognition.recognize(&frame.image) else {
            let faces = self.services.recognition.count_faces(&frame.image);
            if faces > 0 {
                warn!(
                    "[{}] Unauthorized person detected ({} face(s))",
                    camera_id, faces
                );
                self.deliver(session, Alert::unauthorized(faces, camera_id), frame);
            }
            return;
        };

        match self
            .services
            .attendance
            .record(&recognized.employee_id, camera_id)
        {
            Ok(Some(direction)) => {
                let alert = Alert::attendance(
                    &recognized.employee_id,
                    &recognized.name,
                    direction,
                    recognized.confidence,
                    camera_id,
                );
                self.deliver(session, alert, frame);
            }
            Ok(None) => debug!(
                "[{}] {} recognized, attendance not recorded",
                camera_id, recognized.employee_id
            ),
            Err(e) => warn!("[{}] Attendance recording failed: {}", camera_id, e),
        }
    }

    fn process_activity(&mut self, session: &CameraSession, frame: &SharedFrame) {
        if let Some(finding) = self.analyzer.analyze(&frame.image) {
            let alert = Alert::behavior(
                AlertCategory::from(finding.category),
                finding.confidence,
                finding.details,
                session.camera_id(),
                self.role,
            );
            self.deliver(session, alert, frame);
        }
    }

    fn deliver(&mut self, session: &CameraSession, alert: Alert, frame: &SharedFrame) {
        if !self.throttle.admit(&alert) {
            return;
        }
        info!(
            "[{}] Alert {}: {}",
            alert.camera_id, alert.category, alert.message
        );
        let history = session.history_snapshot();
        self.services.clips.fire(&alert, &history, frame);
        if let Some(unread) = session.post_alert(alert) {
            debug!(
                "[{}] Unread {} alert replaced",
                unread.camera_id, unread.category
            );
        }
    }
}
