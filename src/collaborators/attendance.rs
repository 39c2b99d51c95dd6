//! Shift-aware attendance bookkeeping.
//!
//! A recognition becomes an attendance passage only inside the employee's
//! shift (lunch excluded) and at least `cooldown` after that employee's
//! previous passage. The first passage of a day is an entry; afterwards
//! passages alternate between exit and entry.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use log::{debug, info};

use crate::error_handling::types::AttendanceError;

use super::traits::{AttendanceRecorder, EmployeeDirectory};
use super::types::{AttendanceDirection, AttendanceEntry, DailyAttendance};

pub const DEFAULT_ATTENDANCE_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Default)]
struct RecorderState {
    last_seen: HashMap<String, NaiveDateTime>,
    days: BTreeMap<(String, NaiveDate), DailyAttendance>,
}

pub struct ShiftAttendanceRecorder {
    directory: Arc<dyn EmployeeDirectory>,
    cooldown: Duration,
    state: Mutex<RecorderState>,
}

impl ShiftAttendanceRecorder {
    pub fn new(directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self::with_cooldown(directory, DEFAULT_ATTENDANCE_COOLDOWN)
    }

    pub fn with_cooldown(directory: Arc<dyn EmployeeDirectory>, cooldown: Duration) -> Self {
        Self {
            directory,
            cooldown,
            state: Mutex::new(RecorderState::default()),
        }
    }

    /// Same as [`AttendanceRecorder::record`] with an explicit local time.
    pub fn record_at(
        &self,
        employee_id: &str,
        camera_id: &str,
        now: NaiveDateTime,
    ) -> Result<Option<AttendanceDirection>, AttendanceError> {
        let employee = self
            .directory
            .get(employee_id)
            .ok_or_else(|| AttendanceError::UnknownEmployee(employee_id.to_string()))?;

        if !employee.shift.contains(now.time()) {
            debug!("{} seen outside shift at {}", employee_id, now.time());
            return Ok(None);
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(last) = state.last_seen.get(employee_id) {
            let elapsed = now.signed_duration_since(*last);
            if elapsed.to_std().map_or(true, |e| e < self.cooldown) {
                debug!("{} seen again within cooldown", employee_id);
                return Ok(None);
            }
        }
        state.last_seen.insert(employee_id.to_string(), now);

        let day = state
            .days
            .entry((employee_id.to_string(), now.date()))
            .or_insert_with(|| DailyAttendance::new(employee_id, now.date()));
        let direction = day.next_direction();
        day.push(AttendanceEntry {
            direction,
            time: now,
            camera_id: camera_id.to_string(),
        });

        info!(
            "[{}] Attendance {} recorded for {} ({})",
            camera_id, direction, employee.name, employee_id
        );
        Ok(Some(direction))
    }

    pub fn day(&self, employee_id: &str, date: NaiveDate) -> Option<DailyAttendance> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .days
            .get(&(employee_id.to_string(), date))
            .cloned()
    }
}

impl AttendanceRecorder for ShiftAttendanceRecorder {
    fn record(
        &self,
        employee_id: &str,
        camera_id: &str,
    ) -> Result<Option<AttendanceDirection>, AttendanceError> {
        self.record_at(employee_id, camera_id, Local::now().naive_local())
    }

    fn today(&self, employee_id: &str) -> Option<DailyAttendance> {
        self.day(employee_id, Local::now().date_naive())
    }

    fn month(&self, employee_id: &str, year: i32, month: u32) -> Vec<DailyAttendance> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .days
            .iter()
            .filter(|((id, date), _)| {
                id == employee_id && date.year() == year && date.month() == month
            })
            .map(|(_, day)| day.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::directory::InMemoryEmployeeDirectory;
    use crate::configuration::types::EmployeeConfig;

    fn recorder() -> ShiftAttendanceRecorder {
        let directory = InMemoryEmployeeDirectory::from_configs(&[EmployeeConfig {
            employee_id: "E1".to_string(),
            name: "Asha".to_string(),
            department: Some("Ops".to_string()),
            active: true,
            shift_start: None,
            shift_end: None,
            lunch_start: None,
            lunch_end: None,
        }])
        .unwrap();
        ShiftAttendanceRecorder::new(Arc::new(directory))
    }

    fn at(day: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    #[test]
    fn test_first_passage_is_entry_then_alternates() {
        let recorder = recorder();
        assert_eq!(
            recorder.record_at("E1", "door-1", at(4, 10, 45, 0)).unwrap(),
            Some(AttendanceDirection::Entry)
        );
        assert_eq!(
            recorder.record_at("E1", "door-1", at(4, 12, 0, 0)).unwrap(),
            Some(AttendanceDirection::Exit)
        );
        assert_eq!(
            recorder.record_at("E1", "door-1", at(4, 15, 0, 0)).unwrap(),
            Some(AttendanceDirection::Entry)
        );
        let day = recorder.day("E1", at(4, 0, 0, 0).date()).unwrap();
        assert_eq!(day.total_entries, 2);
        assert_eq!(day.total_exits, 1);
        assert_eq!(day.first_entry, Some(at(4, 10, 45, 0)));
        assert_eq!(day.last_exit, Some(at(4, 12, 0, 0)));
    }

    #[test]
    fn test_cooldown_suppresses_repeat_sightings() {
        let recorder = recorder();
        assert!(recorder.record_at("E1", "door-1", at(4, 11, 0, 0)).unwrap().is_some());
        assert!(recorder.record_at("E1", "door-1", at(4, 11, 0, 29)).unwrap().is_none());
        assert_eq!(
            recorder.record_at("E1", "door-1", at(4, 11, 0, 30)).unwrap(),
            Some(AttendanceDirection::Exit)
        );
    }

    #[test]
    fn test_outside_shift_and_lunch_not_recorded() {
        let recorder = recorder();
        assert!(recorder.record_at("E1", "door-1", at(4, 9, 0, 0)).unwrap().is_none());
        assert!(recorder.record_at("E1", "door-1", at(4, 14, 0, 0)).unwrap().is_none());
        assert!(recorder.record_at("E1", "door-1", at(4, 18, 30, 0)).unwrap().is_none());
        assert!(recorder.day("E1", at(4, 0, 0, 0).date()).is_none());
    }

    #[test]
    fn test_unknown_employee_is_error() {
        let err = recorder()
            .record_at("ghost", "door-1", at(4, 11, 0, 0))
            .err()
            .unwrap();
        assert!(matches!(err, AttendanceError::UnknownEmployee(_)));
    }

    #[test]
    fn test_month_query_groups_days() {
        let recorder = recorder();
        recorder.record_at("E1", "door-1", at(4, 11, 0, 0)).unwrap();
        recorder.record_at("E1", "door-1", at(5, 11, 0, 0)).unwrap();
        let days = recorder.month("E1", 2024, 3);
        assert_eq!(days.len(), 2);
        assert!(days[0].date < days[1].date);
        // new day starts over with an entry
        assert_eq!(days[1].entries[0].direction, AttendanceDirection::Entry);
        assert!(recorder.month("E1", 2024, 4).is_empty());
    }
}
