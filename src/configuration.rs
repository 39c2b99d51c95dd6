pub mod config;
pub mod types;

pub use config::{parse_time_of_day, validate_camera, Config, ConfigOverrides};
pub use types::{CameraConfig, CameraRole, EmployeeConfig};
