//! Narrow interfaces to the services the capture core consults.

use crate::error_handling::types::AttendanceError;

use super::types::{AttendanceDirection, DailyAttendance, EmployeeRecord};

/// Source of employee identities.
pub trait EmployeeDirectory: Send + Sync {
    fn get(&self, employee_id: &str) -> Option<EmployeeRecord>;

    fn list(&self, active_only: bool) -> Vec<EmployeeRecord>;
}

/// Turns recognitions at a door into attendance records.
///
/// Shift windows, lunch exclusion and the per-employee cooldown belong to
/// the implementor. `Ok(None)` means the recognition was valid but not
/// recorded (outside shift or too soon after the previous one).
pub trait AttendanceRecorder: Send + Sync {
    fn record(
        &self,
        employee_id: &str,
        camera_id: &str,
    ) -> Result<Option<AttendanceDirection>, AttendanceError>;

    /// Today's record for an employee, if any passage was recorded.
    fn today(&self, employee_id: &str) -> Option<DailyAttendance>;

    /// Every recorded day of a calendar month, oldest first.
    fn month(&self, employee_id: &str, year: i32, month: u32) -> Vec<DailyAttendance>;
}
