use super::types::*;
use crate::error_handling::types::ConfigError;
use chrono::NaiveTime;
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration loaded from a TOML file.
///
/// Every section is optional; an empty file yields a runnable configuration
/// with no cameras and no employees. Cameras can also be added at runtime
/// through the registry.
///
/// # Example
///
/// ```toml
/// [server]
/// port = 8080
///
/// [[cameras]]
/// camera_id = "front-door"
/// source = "rtsp://10.0.0.12/stream1"
/// role = "door"
///
/// [[employees]]
/// employee_id = "E001"
/// name = "Ada"
/// shift_start = "09:00 AM"
/// shift_end = "05:00 PM"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub capture: CaptureConfig,
    pub behavior: BehaviorConfig,
    pub alerts: AlertConfig,
    pub recognition: RecognitionConfig,
    pub archive: ArchiveConfig,
    pub cameras: Vec<CameraConfig>,
    pub employees: Vec<EmployeeConfig>,
}

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub storage_path: Option<PathBuf>,
}

impl Config {
    /// Reads and validates a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        debug!(
            "Configuration parsed: {} camera(s), {} employee(s)",
            config.cameras.len(),
            config.employees.len()
        );
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(storage_path) = overrides.storage_path {
            self.archive.storage_path = storage_path;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let capture = &self.capture;
        ensure(capture.history_capacity > 0, "capture.history_capacity must be > 0")?;
        ensure(capture.door_stride > 0, "capture.door_stride must be > 0")?;
        ensure(capture.activity_stride > 0, "capture.activity_stride must be > 0")?;
        ensure(capture.read_failure_limit > 0, "capture.read_failure_limit must be > 0")?;
        ensure(capture.error_limit > 0, "capture.error_limit must be > 0")?;
        ensure(
            capture.network_connect_attempts > 0,
            "capture.network_connect_attempts must be > 0",
        )?;
        ensure(
            capture.frame_width > 0 && capture.frame_height > 0,
            "capture.frame_width and capture.frame_height must be > 0",
        )?;

        ensure(
            (1..=120).contains(&self.server.stream_fps),
            "server.stream_fps must be within 1..=120",
        )?;
        ensure(
            (1..=100).contains(&self.server.stream_jpeg_quality),
            "server.stream_jpeg_quality must be within 1..=100",
        )?;

        let behavior = &self.behavior;
        ensure(behavior.warmup_samples > 0, "behavior.warmup_samples must be > 0")?;
        ensure(
            behavior.warmup_samples <= behavior.motion_history,
            "behavior.warmup_samples cannot exceed behavior.motion_history",
        )?;
        ensure(
            behavior.wander_min_positions <= behavior.position_history,
            "behavior.wander_min_positions cannot exceed behavior.position_history",
        )?;
        ensure(behavior.nominal_fps > 0.0, "behavior.nominal_fps must be > 0")?;
        ensure(
            behavior.background_history > 0,
            "behavior.background_history must be > 0",
        )?;

        let thresholds = &self.recognition.thresholds;
        ensure(!thresholds.is_empty(), "recognition.thresholds cannot be empty")?;
        ensure(
            thresholds.iter().all(|t| *t > 0.0 && *t <= 1.0),
            "recognition.thresholds must be within (0, 1]",
        )?;
        ensure(
            thresholds.windows(2).all(|w| w[0] < w[1]),
            "recognition.thresholds must be strictly ascending",
        )?;

        let archive = &self.archive;
        ensure(
            archive.short_window_frames > 0 && archive.long_window_frames > 0,
            "archive clip windows must be > 0",
        )?;
        ensure(archive.queue_capacity > 0, "archive.queue_capacity must be > 0")?;
        ensure(archive.clip_fps > 0.0, "archive.clip_fps must be > 0")?;
        ensure(
            (1..=100).contains(&archive.thumbnail_quality),
            "archive.thumbnail_quality must be within 1..=100",
        )?;

        let mut seen = HashSet::new();
        for camera in &self.cameras {
            validate_camera(camera)?;
            if !seen.insert(camera.camera_id.as_str()) {
                return Err(ConfigError::DuplicateCamera(camera.camera_id.clone()));
            }
        }

        for employee in &self.employees {
            let times = [
                &employee.shift_start,
                &employee.shift_end,
                &employee.lunch_start,
                &employee.lunch_end,
            ];
            for time in times.into_iter().flatten() {
                if parse_time_of_day(time).is_none() {
                    return Err(ConfigError::InvalidTime(format!(
                        "{} (employee {})",
                        time, employee.employee_id
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Checks a single camera entry; also used when cameras are added at runtime.
pub fn validate_camera(camera: &CameraConfig) -> Result<(), ConfigError> {
    let id_pattern = Regex::new(r"^[A-Za-z0-9_.-]+$").map_err(|e| {
        ConfigError::InvalidSource(format!("camera id pattern failed to compile: {}", e))
    })?;
    if !id_pattern.is_match(&camera.camera_id) {
        return Err(ConfigError::NotInRange(format!(
            "camera_id '{}' may only contain letters, digits, '_', '-' and '.'",
            camera.camera_id
        )));
    }
    if camera.source.trim().is_empty() {
        return Err(ConfigError::InvalidSource(format!(
            "camera '{}' has an empty source",
            camera.camera_id
        )));
    }
    Ok(())
}

/// Parses a time of day written either as `10:30 AM` or `18:00`.
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%I:%M %p")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

fn ensure(condition: bool, message: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::NotInRange(message.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[server]
port = 9000

[alerts]
throttle_secs = 30

[[cameras]]
camera_id = "front-door"
name = "Front door"
source = "rtsp://10.0.0.12/stream1"
role = "door"

[[cameras]]
camera_id = "floor-1"
source = "0"
camera_type = "security"

[[employees]]
employee_id = "E001"
name = "Ada"
shift_start = "09:00 AM"
shift_end = "17:30"
"#;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.capture.history_capacity, 300);
        assert_eq!(config.capture.door_stride, 10);
        assert_eq!(config.capture.activity_stride, 45);
        assert_eq!(config.behavior.alert_cooldown_secs, 60);
        assert_eq!(config.alerts.throttle_secs, 60);
        assert_eq!(config.recognition.thresholds, vec![0.6, 0.7, 0.8]);
    }

    #[test]
    fn test_sample_parses_roles_and_overrides() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.stream_fps, 60);
        assert_eq!(config.alerts.throttle_secs, 30);
        assert_eq!(config.cameras.len(), 2);
        assert_eq!(config.cameras[0].role, CameraRole::Door);
        // legacy "security" cameras run as activity cameras
        assert_eq!(config.cameras[1].role, CameraRole::Activity);
        assert_eq!(config.cameras[1].name, "Unknown");
        assert_eq!(config.employees[0].shift_end.as_deref(), Some("17:30"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.cameras[0].camera_id, "front-door");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_duplicate_camera_rejected() {
        let text = r#"
[[cameras]]
camera_id = "a"
[[cameras]]
camera_id = "a"
"#;
        let err = Config::from_toml_str(text).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateCamera(id) if id == "a"));
    }

    #[test]
    fn test_thresholds_must_ascend() {
        let err = Config::from_toml_str("[recognition]\nthresholds = [0.8, 0.6]\n").unwrap_err();
        assert!(matches!(err, ConfigError::NotInRange(_)));
    }

    #[test]
    fn test_bad_employee_time_rejected() {
        let text = r#"
[[employees]]
employee_id = "E9"
name = "Bob"
shift_start = "quarter past nine"
"#;
        let err = Config::from_toml_str(text).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTime(_)));
    }

    #[test]
    fn test_invalid_camera_id_rejected() {
        let camera = CameraConfig {
            camera_id: "bad id!".into(),
            name: "x".into(),
            source: "0".into(),
            location: "x".into(),
            role: CameraRole::Activity,
        };
        assert!(validate_camera(&camera).is_err());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            bind_address: Some("127.0.0.1".into()),
            port: Some(1234),
            storage_path: Some(PathBuf::from("/tmp/vigil")),
        });
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.server.port, 1234);
        assert_eq!(config.archive.storage_path, PathBuf::from("/tmp/vigil"));
    }

    #[test]
    fn test_parse_time_of_day_formats() {
        assert_eq!(
            parse_time_of_day("10:30 AM"),
            NaiveTime::from_hms_opt(10, 30, 0)
        );
        assert_eq!(parse_time_of_day("06:00 PM"), NaiveTime::from_hms_opt(18, 0, 0));
        assert_eq!(parse_time_of_day("14:15"), NaiveTime::from_hms_opt(14, 15, 0));
        assert_eq!(parse_time_of_day("25:00"), None);
    }

    #[test]
    fn test_bundled_configuration_is_valid() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("vigil.toml");
        let config = Config::from_file(&path).unwrap();
        config.validate().unwrap();
        assert_eq!(config.cameras.len(), 2);
        assert_eq!(config.cameras[0].role, CameraRole::Door);
        assert_eq!(config.employees[0].employee_id, "E001");
    }
}
