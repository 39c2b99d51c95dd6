//! External collaborators consulted by the capture core.
//!
//! Components:
//! - `traits`: the `EmployeeDirectory` and `AttendanceRecorder` interfaces.
//! - `types`: employee records, shift windows and attendance days.
//! - `directory`: in-memory employee directory seeded from configuration.
//! - `attendance`: shift-aware attendance recorder with per-employee cooldown.

pub mod attendance;
pub mod directory;
pub mod traits;
pub mod types;

pub use attendance::ShiftAttendanceRecorder;
pub use directory::InMemoryEmployeeDirectory;
pub use traits::{AttendanceRecorder, EmployeeDirectory};
pub use types::{AttendanceDirection, AttendanceEntry, DailyAttendance, EmployeeRecord, ShiftWindow};
