use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::capture::CameraState;
use crate::configuration::types::{CameraConfig, CameraRole};

/// A configured camera and whether it is capturing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraListing {
    #[serde(flatten)]
    pub config: CameraConfig,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraStats {
    pub camera_id: String,
    pub role: CameraRole,
    pub state: CameraState,
    pub running: bool,
    pub frame_count: u64,
    pub buffer_size: usize,
    /// Nominal rate of the MJPEG stream, not the measured capture rate.
    pub fps: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraInfo {
    pub camera_id: String,
    pub name: String,
    pub location: String,
    pub role: CameraRole,
    pub is_active: bool,
    pub frame_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickStatus {
    pub active_count: usize,
    pub total_cameras: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecuritySummary {
    pub summary: String,
    pub active_cameras: usize,
    pub total_alerts: usize,
    pub timestamp: DateTime<Utc>,
}

/// Result of opening a source once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceProbe {
    pub source: String,
    pub width: u32,
    pub height: u32,
}
