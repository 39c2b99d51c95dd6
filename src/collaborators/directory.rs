use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use log::info;

use crate::configuration::types::EmployeeConfig;
use crate::error_handling::types::AttendanceError;

use super::traits::EmployeeDirectory;
use super::types::EmployeeRecord;

/// Employee directory held in memory, seeded from the configuration file.
#[derive(Default)]
pub struct InMemoryEmployeeDirectory {
    employees: RwLock<BTreeMap<String, EmployeeRecord>>,
}

impl InMemoryEmployeeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configs(configs: &[EmployeeConfig]) -> Result<Self, AttendanceError> {
        let directory = Self::new();
        for config in configs {
            directory.insert(EmployeeRecord::try_from(config)?);
        }
        info!("Employee directory loaded with {} record(s)", configs.len());
        Ok(directory)
    }

    /// Adds or replaces a record.
    pub fn insert(&self, record: EmployeeRecord) {
        self.employees
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.employee_id.clone(), record);
    }
}

impl EmployeeDirectory for InMemoryEmployeeDirectory {
    fn get(&self, employee_id: &str) -> Option<EmployeeRecord> {
        self.employees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(employee_id)
            .cloned()
    }

    fn list(&self, active_only: bool) -> Vec<EmployeeRecord> {
        self.employees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|record| !active_only || record.active)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(id: &str, active: bool) -> EmployeeConfig {
        EmployeeConfig {
            employee_id: id.to_string(),
            name: format!("Employee {}", id),
            department: None,
            active,
            shift_start: Some("09:00".to_string()),
            shift_end: None,
            lunch_start: None,
            lunch_end: None,
        }
    }

    #[test]
    fn test_seeded_directory_lookup_and_listing() {
        let directory =
            InMemoryEmployeeDirectory::from_configs(&[employee("E1", true), employee("E2", false)])
                .unwrap();
        let record = directory.get("E1").unwrap();
        assert_eq!(record.name, "Employee E1");
        assert_eq!(record.shift.start.to_string(), "09:00:00");
        assert_eq!(record.shift.end.to_string(), "18:00:00");
        assert!(directory.get("nobody").is_none());
        assert_eq!(directory.list(false).len(), 2);
        assert_eq!(directory.list(true).len(), 1);
    }

    #[test]
    fn test_invalid_shift_time_rejected() {
        let mut config = employee("E3", true);
        config.lunch_end = Some("half past two".to_string());
        let err = InMemoryEmployeeDirectory::from_configs(&[config]).err().unwrap();
        assert!(matches!(err, AttendanceError::InvalidShift(_)));
    }
}
