use std::sync::Arc;

use log::{debug, warn};
use serde_json::json;

use crate::alerting::types::{Alert, AlertCategory, AlertKind, Details};
use crate::configuration::types::ArchiveConfig;
use crate::frame_source::types::SharedFrame;

use super::dispatcher::ClipDispatcher;
use super::types::ClipRequest;

/// Frames repeated when a security clip is requested with no history.
const SECURITY_FALLBACK_COPIES: usize = 30;

/// Turns alerts into clip requests and hands them to the dispatcher.
///
/// Window size follows severity: routine attendance keeps the short window,
/// security events the long one, and behavior alerts the whole history plus
/// a thumbnail of the triggering frame.
pub struct ClipTrigger {
    dispatcher: Arc<ClipDispatcher>,
    short_window: usize,
    long_window: usize,
    thumbnail_size: (u32, u32),
    thumbnail_quality: u8,
}

impl ClipTrigger {
    pub fn new(dispatcher: Arc<ClipDispatcher>, config: &ArchiveConfig) -> Self {
        Self {
            dispatcher,
            short_window: config.short_window_frames,
            long_window: config.long_window_frames,
            thumbnail_size: (config.thumbnail_width, config.thumbnail_height),
            thumbnail_quality: config.thumbnail_quality,
        }
    }

    /// Builds and dispatches the clip for `alert`. Never fails: problems are
    /// logged and the clip is dropped.
    pub fn fire(&self, alert: &Alert, history: &[SharedFrame], current: &SharedFrame) {
        let Some(request) = self.build(alert, history, current) else {
            debug!("[{}] No frames for {} clip", alert.camera_id, alert.category);
            return;
        };
        if let Err(e) = self.dispatcher.dispatch(request) {
            warn!("[{}] Clip for {} not queued: {}", alert.camera_id, alert.category, e);
        }
    }

    pub fn build(
        &self,
        alert: &Alert,
        history: &[SharedFrame],
        current: &SharedFrame,
    ) -> Option<ClipRequest> {
        let event_type = event_type(alert);
        let metadata = metadata(alert);

        let request = match alert.category {
            AlertCategory::AttendanceRecorded => ClipRequest::from_window(
                history,
                self.short_window,
                &alert.camera_id,
                &event_type,
                metadata,
            ),
            AlertCategory::UnauthorizedPerson => {
                let mut request = ClipRequest::from_window(
                    history,
                    self.long_window,
                    &alert.camera_id,
                    &event_type,
                    metadata,
                );
                if request.frames.is_empty() {
                    request.frames = vec![Arc::clone(current); SECURITY_FALLBACK_COPIES];
                }
                request
            }
            _ => {
                let (width, height) = self.thumbnail_size;
                let thumbnail = match current.thumbnail_jpeg(width, height, self.thumbnail_quality)
                {
                    Ok(jpeg) => Some(jpeg),
                    Err(e) => {
                        warn!("[{}] Thumbnail creation failed: {}", alert.camera_id, e);
                        None
                    }
                };
                ClipRequest::from_window(
                    history,
                    history.len(),
                    &alert.camera_id,
                    &event_type,
                    metadata,
                )
                .with_thumbnail(thumbnail)
            }
        };

        if request.frames.is_empty() {
            None
        } else {
            Some(request)
        }
    }
}

/// `<role>_<category>`, e.g. `door_attendance_recorded` or `activity_idle`.
pub fn event_type(alert: &Alert) -> String {
    format!("{}_{}", alert.camera_role, alert.category).to_lowercase()
}

fn metadata(alert: &Alert) -> Details {
    let mut metadata = Details::new();
    metadata.insert("alert_type".into(), json!(alert.category));
    metadata.insert("alert_id".into(), json!(alert.id));
    metadata.insert("confidence".into(), json!(alert.confidence));
    metadata.insert("message".into(), json!(alert.message));
    metadata.insert("timestamp".into(), json!(alert.timestamp.to_rfc3339()));
    metadata.insert("camera_id".into(), json!(alert.camera_id));
    metadata.insert("camera_type".into(), json!(alert.camera_role));
    metadata.insert("details".into(), json!(alert.details));
    if let Some(ref assessment) = alert.assessment {
        metadata.insert("threat_level".into(), json!(assessment.threat_level));
    }
    match &alert.kind {
        AlertKind::Attendance {
            employee_id, name, ..
        } => {
            metadata.insert("employee_id".into(), json!(employee_id));
            metadata.insert("person_name".into(), json!(name));
        }
        AlertKind::UnauthorizedPerson { faces_detected } => {
            metadata.insert("faces_detected".into(), json!(faces_detected));
            metadata.insert("authorized".into(), json!(false));
            metadata.insert("security_priority".into(), json!("immediate"));
        }
        AlertKind::Behavior {
            identity_checked,
            likely_employee,
        } => {
            metadata.insert("identity_checked".into(), json!(identity_checked));
            metadata.insert("likely_employee".into(), json!(likely_employee));
        }
    }
    metadata
}
