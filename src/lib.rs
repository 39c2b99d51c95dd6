pub mod configuration;
pub mod error_handling;

pub mod frame_source;

pub mod behavior;

pub mod recognition;

pub mod alerting;

pub mod archival;

pub mod collaborators;

pub mod capture;

pub mod camera_management;
pub use camera_management::CameraRegistry;

pub mod web_interface;
pub use web_interface::WebServer;
