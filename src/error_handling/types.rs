use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    NotInRange(String),
    DuplicateCamera(String),
    InvalidTime(String),
    InvalidSource(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
            ConfigError::DuplicateCamera(id) => write!(f, "Camera id '{}' declared twice", id),
            ConfigError::InvalidTime(e) => write!(f, "Invalid time of day: {}", e),
            ConfigError::InvalidSource(e) => write!(f, "Invalid camera source: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlError(err.to_string())
    }
}

/// Faults raised while opening or reading a frame source.
#[derive(Debug)]
pub enum CaptureError {
    /// The handle could not be opened or no frame arrived within the attempt budget.
    ConnectionError(String),
    /// The capture backend (e.g. the ffmpeg binary) is not installed.
    BackendUnavailable(String),
    /// The underlying stream ended; no further frames will arrive.
    StreamClosed,
    /// A frame arrived but could not be decoded.
    DecodeFailed(String),
    IoError(std::io::Error),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::ConnectionError(e) => write!(f, "Connection error: {}", e),
            CaptureError::BackendUnavailable(e) => write!(f, "Capture backend unavailable: {}", e),
            CaptureError::StreamClosed => write!(f, "Frame stream closed"),
            CaptureError::DecodeFailed(e) => write!(f, "Frame decode failed: {}", e),
            CaptureError::IoError(e) => write!(f, "Capture IO error: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::IoError(err)
    }
}

/// Failures surfaced to callers of the camera registry.
#[derive(Debug)]
pub enum CameraError {
    NotConfigured(String),
    AlreadyRunning(String),
    NotRunning(String),
    DuplicateCamera(String),
    InvalidConfig(ConfigError),
    Connection(CaptureError),
    InitTimeout { camera_id: String, timeout: Duration },
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NotConfigured(id) => {
                write!(f, "Camera '{}' not found in configuration", id)
            }
            CameraError::AlreadyRunning(id) => write!(f, "Camera '{}' already running", id),
            CameraError::NotRunning(id) => write!(f, "Camera '{}' not running", id),
            CameraError::DuplicateCamera(id) => write!(f, "Camera ID '{}' already exists", id),
            CameraError::InvalidConfig(e) => write!(f, "Invalid camera configuration: {}", e),
            CameraError::Connection(e) => write!(f, "Camera source not available: {}", e),
            CameraError::InitTimeout { camera_id, timeout } => write!(
                f,
                "Camera '{}' initialization timeout after {:.1}s",
                camera_id,
                timeout.as_secs_f64()
            ),
        }
    }
}

impl std::error::Error for CameraError {}

impl From<ConfigError> for CameraError {
    fn from(err: ConfigError) -> Self {
        CameraError::InvalidConfig(err)
    }
}

impl From<CaptureError> for CameraError {
    fn from(err: CaptureError) -> Self {
        CameraError::Connection(err)
    }
}

#[derive(Debug)]
pub enum RecognitionError {
    Encoding(String),
    Network(String),
    BadResponse(String),
}

impl fmt::Display for RecognitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognitionError::Encoding(e) => write!(f, "Frame encoding error: {}", e),
            RecognitionError::Network(e) => write!(f, "Face matcher unreachable: {}", e),
            RecognitionError::BadResponse(e) => write!(f, "Face matcher bad response: {}", e),
        }
    }
}

impl std::error::Error for RecognitionError {}

impl From<reqwest::Error> for RecognitionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RecognitionError::BadResponse(err.to_string())
        } else {
            RecognitionError::Network(err.to_string())
        }
    }
}

impl From<image::ImageError> for RecognitionError {
    fn from(err: image::ImageError) -> Self {
        RecognitionError::Encoding(err.to_string())
    }
}

#[derive(Debug)]
pub enum AttendanceError {
    UnknownEmployee(String),
    InvalidShift(String),
}

impl fmt::Display for AttendanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceError::UnknownEmployee(id) => write!(f, "Unknown employee '{}'", id),
            AttendanceError::InvalidShift(e) => write!(f, "Invalid shift definition: {}", e),
        }
    }
}

impl std::error::Error for AttendanceError {}

#[derive(Debug)]
pub enum ArchiveError {
    EmptyClip,
    WriteFailed(String),
    ReadFailed(String),
    NotFound(String),
    Encoding(String),
    QueueFull,
    Closed,
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveError::EmptyClip => write!(f, "Clip has no frames"),
            ArchiveError::WriteFailed(e) => write!(f, "Archive write failed: {}", e),
            ArchiveError::ReadFailed(e) => write!(f, "Archive read failed: {}", e),
            ArchiveError::NotFound(id) => write!(f, "Clip '{}' not found", id),
            ArchiveError::Encoding(e) => write!(f, "Clip encoding error: {}", e),
            ArchiveError::QueueFull => write!(f, "Clip dispatch queue full"),
            ArchiveError::Closed => write!(f, "Clip dispatcher closed"),
        }
    }
}

impl std::error::Error for ArchiveError {}

impl From<image::ImageError> for ArchiveError {
    fn from(err: image::ImageError) -> Self {
        ArchiveError::Encoding(err.to_string())
    }
}

impl From<serde_json::Error> for ArchiveError {
    fn from(err: serde_json::Error) -> Self {
        ArchiveError::Encoding(err.to_string())
    }
}

#[derive(Debug)]
pub enum WebError {
    InvalidAddress(String),
    BindFailed(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::InvalidAddress(e) => write!(f, "Invalid listen address: {}", e),
            WebError::BindFailed(e) => write!(f, "Web server bind failed: {}", e),
        }
    }
}

impl std::error::Error for WebError {}
