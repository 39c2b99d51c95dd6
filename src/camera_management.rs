//! Explicit camera registry.
//!
//! Owns the configured cameras and their live sessions. Created once at
//! process start and shared with the HTTP handlers.

pub mod camera_registry;
pub mod types;


pub use camera_registry::CameraRegistry;
pub use types::*;
