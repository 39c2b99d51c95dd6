use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::configuration::parse_time_of_day;
use crate::configuration::types::EmployeeConfig;
use crate::error_handling::types::AttendanceError;

pub const DEFAULT_SHIFT_START: &str = "10:30 AM";
pub const DEFAULT_SHIFT_END: &str = "06:00 PM";
pub const DEFAULT_LUNCH_START: &str = "01:30 PM";
pub const DEFAULT_LUNCH_END: &str = "02:30 PM";

/// Working hours of one employee, lunch excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub lunch_start: NaiveTime,
    pub lunch_end: NaiveTime,
}

impl ShiftWindow {
    pub fn contains(&self, time: NaiveTime) -> bool {
        if time < self.start || time > self.end {
            return false;
        }
        !(self.lunch_start <= time && time <= self.lunch_end)
    }
}

impl Default for ShiftWindow {
    fn default() -> Self {
        let parse = |value| parse_time_of_day(value).unwrap_or(NaiveTime::MIN);
        Self {
            start: parse(DEFAULT_SHIFT_START),
            end: parse(DEFAULT_SHIFT_END),
            lunch_start: parse(DEFAULT_LUNCH_START),
            lunch_end: parse(DEFAULT_LUNCH_END),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub employee_id: String,
    pub name: String,
    pub department: Option<String>,
    pub active: bool,
    pub shift: ShiftWindow,
}

impl TryFrom<&EmployeeConfig> for EmployeeRecord {
    type Error = AttendanceError;

    fn try_from(config: &EmployeeConfig) -> Result<Self, Self::Error> {
        let defaults = ShiftWindow::default();
        let time = |value: &Option<String>, fallback: NaiveTime| match value {
            Some(text) => parse_time_of_day(text).ok_or_else(|| {
                AttendanceError::InvalidShift(format!("{}: '{}'", config.employee_id, text))
            }),
            None => Ok(fallback),
        };
        Ok(Self {
            employee_id: config.employee_id.clone(),
            name: config.name.clone(),
            department: config.department.clone(),
            active: config.active,
            shift: ShiftWindow {
                start: time(&config.shift_start, defaults.start)?,
                end: time(&config.shift_end, defaults.end)?,
                lunch_start: time(&config.lunch_start, defaults.lunch_start)?,
                lunch_end: time(&config.lunch_end, defaults.lunch_end)?,
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceDirection {
    Entry,
    Exit,
}

impl AttendanceDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceDirection::Entry => "entry",
            AttendanceDirection::Exit => "exit",
        }
    }
}

impl fmt::Display for AttendanceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub direction: AttendanceDirection,
    pub time: NaiveDateTime,
    pub camera_id: String,
}

/// All door passages of one employee on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAttendance {
    pub employee_id: String,
    pub date: NaiveDate,
    pub entries: Vec<AttendanceEntry>,
    pub total_entries: usize,
    pub total_exits: usize,
    pub first_entry: Option<NaiveDateTime>,
    pub last_exit: Option<NaiveDateTime>,
    pub status: String,
}

impl DailyAttendance {
    pub fn new(employee_id: &str, date: NaiveDate) -> Self {
        Self {
            employee_id: employee_id.to_string(),
            date,
            entries: Vec::new(),
            total_entries: 0,
            total_exits: 0,
            first_entry: None,
            last_exit: None,
            status: "present".to_string(),
        }
    }

    /// Entry if the day is empty or the last passage was an exit, exit otherwise.
    pub fn next_direction(&self) -> AttendanceDirection {
        match self.entries.last() {
            Some(last) if last.direction == AttendanceDirection::Entry => AttendanceDirection::Exit,
            _ => AttendanceDirection::Entry,
        }
    }

    pub fn push(&mut self, entry: AttendanceEntry) {
        match entry.direction {
            AttendanceDirection::Entry => {
                self.total_entries += 1;
                if self.first_entry.is_none() {
                    self.first_entry = Some(entry.time);
                }
            }
            AttendanceDirection::Exit => {
                self.total_exits += 1;
                self.last_exit = Some(entry.time);
            }
        }
        self.entries.push(entry);
    }
}
