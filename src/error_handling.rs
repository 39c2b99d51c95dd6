//! Error taxonomy shared by every subsystem.
//!
//! Connection faults abort a camera start. Everything raised after that is
//! logged at its own boundary, so only [`types::CameraError`] reaches API
//! callers.

pub mod types;

pub use types::{
    ArchiveError, AttendanceError, CameraError, CaptureError, ConfigError, RecognitionError,
    WebError,
};
