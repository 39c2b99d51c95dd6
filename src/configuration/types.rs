use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Role of a camera in the monitoring setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraRole {
    /// Entry/exit recognition and attendance triggering.
    Door,
    /// Behavior monitoring only, never performs identity recognition.
    #[serde(alias = "security")]
    Activity,
}

impl CameraRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraRole::Door => "door",
            CameraRole::Activity => "activity",
        }
    }
}

impl Default for CameraRole {
    fn default() -> Self {
        CameraRole::Activity
    }
}

impl fmt::Display for CameraRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub camera_id: String,
    #[serde(default = "unknown")]
    pub name: String,
    /// Device index (`0`), device path (`/dev/video0`) or network URI (`rtsp://...`).
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "unknown")]
    pub location: String,
    #[serde(default, alias = "camera_type")]
    pub role: CameraRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeConfig {
    pub employee_id: String,
    pub name: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default = "enabled")]
    pub active: bool,
    #[serde(default)]
    pub shift_start: Option<String>,
    #[serde(default)]
    pub shift_end: Option<String>,
    #[serde(default)]
    pub lunch_start: Option<String>,
    #[serde(default)]
    pub lunch_end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub stream_fps: u32,
    pub stream_jpeg_quality: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            stream_fps: 60,
            stream_jpeg_quality: 95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub history_capacity: usize,
    pub door_stride: u64,
    pub activity_stride: u64,
    pub read_failure_limit: u32,
    pub error_limit: u32,
    pub failure_backoff_ms: u64,
    pub network_connect_attempts: u32,
    pub connect_backoff_ms: u64,
    pub network_init_timeout_secs: u64,
    pub local_init_timeout_secs: u64,
    pub local_fps_hint: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub read_timeout_ms: u64,
    pub ffmpeg_path: Option<PathBuf>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            history_capacity: 300,
            door_stride: 10,
            activity_stride: 45,
            read_failure_limit: 30,
            error_limit: 10,
            failure_backoff_ms: 100,
            network_connect_attempts: 5,
            connect_backoff_ms: 1000,
            network_init_timeout_secs: 15,
            local_init_timeout_secs: 5,
            local_fps_hint: 60,
            frame_width: 1280,
            frame_height: 720,
            read_timeout_ms: 1000,
            ffmpeg_path: None,
        }
    }
}

impl CaptureConfig {
    pub fn failure_backoff(&self) -> Duration {
        Duration::from_millis(self.failure_backoff_ms)
    }

    pub fn connect_backoff(&self) -> Duration {
        Duration::from_millis(self.connect_backoff_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn init_timeout(&self, network: bool) -> Duration {
        if network {
            Duration::from_secs(self.network_init_timeout_secs)
        } else {
            Duration::from_secs(self.local_init_timeout_secs)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub alert_cooldown_secs: u64,
    pub motion_history: usize,
    pub position_history: usize,
    pub warmup_samples: usize,
    pub min_person_area: u32,
    pub idle_motion_ratio: f64,
    pub idle_seconds: f64,
    pub wander_min_positions: usize,
    pub wander_distance_px: f64,
    pub wander_motion_ratio: f64,
    pub absence_window: usize,
    pub absence_min_quiet: usize,
    pub absence_motion_ratio: f64,
    pub nominal_fps: f64,
    pub background_history: u32,
    pub variance_threshold: f32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            alert_cooldown_secs: 60,
            motion_history: 300,
            position_history: 150,
            warmup_samples: 150,
            min_person_area: 5000,
            idle_motion_ratio: 0.005,
            idle_seconds: 3.0,
            wander_min_positions: 100,
            wander_distance_px: 500.0,
            wander_motion_ratio: 0.02,
            absence_window: 90,
            absence_min_quiet: 60,
            absence_motion_ratio: 0.001,
            nominal_fps: 30.0,
            background_history: 500,
            variance_threshold: 16.0,
        }
    }
}

impl BehaviorConfig {
    pub fn alert_cooldown(&self) -> Duration {
        Duration::from_secs(self.alert_cooldown_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub throttle_secs: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { throttle_secs: 60 }
    }
}

impl AlertConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_secs(self.throttle_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Ascending lenience thresholds, tried in order.
    pub thresholds: Vec<f64>,
    pub service_url: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![0.6, 0.7, 0.8],
            service_url: None,
            request_timeout_ms: 2000,
        }
    }
}

impl RecognitionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub storage_path: PathBuf,
    pub short_window_frames: usize,
    pub long_window_frames: usize,
    pub queue_capacity: usize,
    pub retention_days: u32,
    pub clip_fps: f64,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub thumbnail_quality: u8,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("./clips"),
            short_window_frames: 150,
            long_window_frames: 300,
            queue_capacity: 16,
            retention_days: 3,
            clip_fps: 10.0,
            thumbnail_width: 320,
            thumbnail_height: 240,
            thumbnail_quality: 80,
        }
    }
}

fn unknown() -> String {
    "Unknown".to_string()
}

fn default_source() -> String {
    "0".to_string()
}

fn enabled() -> bool {
    true
}
