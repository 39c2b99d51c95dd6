use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::behavior::BehaviorCategory;
use crate::collaborators::types::AttendanceDirection;
use crate::configuration::types::CameraRole;

use super::messages;

/// Open-ended, string-keyed alert payload.
pub type Details = BTreeMap<String, serde_json::Value>;

/// Alert categories. Unknown names coming from outside the analyzer are
/// kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertCategory {
    Idle,
    Wandering,
    Absence,
    UnauthorizedPerson,
    AttendanceRecorded,
    Suspicious,
    Timepass,
    Loitering,
    Chatting,
    Other(String),
}

impl AlertCategory {
    pub fn as_str(&self) -> &str {
        match self {
            AlertCategory::Idle => "idle",
            AlertCategory::Wandering => "wandering",
            AlertCategory::Absence => "absence",
            AlertCategory::UnauthorizedPerson => "unauthorized_person",
            AlertCategory::AttendanceRecorded => "attendance_recorded",
            AlertCategory::Suspicious => "suspicious",
            AlertCategory::Timepass => "timepass",
            AlertCategory::Loitering => "loitering",
            AlertCategory::Chatting => "chatting",
            AlertCategory::Other(name) => name,
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for AlertCategory {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "idle" => AlertCategory::Idle,
            "wandering" => AlertCategory::Wandering,
            "absence" => AlertCategory::Absence,
            "unauthorized_person" => AlertCategory::UnauthorizedPerson,
            "attendance_recorded" => AlertCategory::AttendanceRecorded,
            "suspicious" => AlertCategory::Suspicious,
            "timepass" | "timepass_phone" => AlertCategory::Timepass,
            "loitering" => AlertCategory::Loitering,
            "chatting" => AlertCategory::Chatting,
            _ => AlertCategory::Other(value),
        }
    }
}

impl From<AlertCategory> for String {
    fn from(category: AlertCategory) -> Self {
        category.as_str().to_string()
    }
}

impl From<BehaviorCategory> for AlertCategory {
    fn from(category: BehaviorCategory) -> Self {
        match category {
            BehaviorCategory::Idle => AlertCategory::Idle,
            BehaviorCategory::Wandering => AlertCategory::Wandering,
            BehaviorCategory::Absence => AlertCategory::Absence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatAssessment {
    pub threat_level: ThreatLevel,
    pub summary: String,
    pub recommendations: Vec<String>,
}

/// Category-specific fields carried next to the common envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertKind {
    Behavior {
        identity_checked: bool,
        likely_employee: String,
    },
    Attendance {
        employee_id: String,
        name: String,
        direction: AttendanceDirection,
    },
    UnauthorizedPerson {
        faces_detected: u32,
    },
}

/// An alert as delivered to API callers. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub category: AlertCategory,
    #[serde(flatten)]
    pub kind: AlertKind,
    pub confidence: f64,
    pub message: String,
    pub details: Details,
    pub camera_id: String,
    pub camera_role: CameraRole,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<ThreatAssessment>,
}

impl Alert {
    /// Behavior alert from an activity camera, with a medium threat assessment.
    pub fn behavior(
        category: AlertCategory,
        confidence: f64,
        details: Details,
        camera_id: &str,
        camera_role: CameraRole,
    ) -> Self {
        let assessment = ThreatAssessment {
            threat_level: ThreatLevel::Medium,
            summary: format!("Suspicious {} behavior detected", category),
            recommendations: vec![
                "Monitor closely".to_string(),
                "Verify employee activity".to_string(),
            ],
        };
        let kind = AlertKind::Behavior {
            identity_checked: false,
            likely_employee: "unknown".to_string(),
        };
        Self::build(category, kind, confidence, details, camera_id, camera_role)
            .with_assessment(assessment)
    }

    pub fn attendance(
        employee_id: &str,
        name: &str,
        direction: AttendanceDirection,
        confidence: f64,
        camera_id: &str,
    ) -> Self {
        let mut details = Details::new();
        details.insert("employee_id".into(), employee_id.into());
        details.insert("name".into(), name.into());
        details.insert("type".into(), direction.as_str().into());
        let kind = AlertKind::Attendance {
            employee_id: employee_id.to_string(),
            name: name.to_string(),
            direction,
        };
        Self::build(
            AlertCategory::AttendanceRecorded,
            kind,
            confidence,
            details,
            camera_id,
            CameraRole::Door,
        )
    }

    /// Unknown face at a door, always treated as high threat.
    pub fn unauthorized(faces_detected: u32, camera_id: &str) -> Self {
        let mut details = Details::new();
        details.insert("faces_detected".into(), faces_detected.into());
        details.insert("authorized".into(), false.into());
        let assessment = ThreatAssessment {
            threat_level: ThreatLevel::High,
            summary: "Unauthorized person detected at door".to_string(),
            recommendations: vec![
                "Immediate security alert".to_string(),
                "Verify identity".to_string(),
                "Check access logs".to_string(),
            ],
        };
        Self::build(
            AlertCategory::UnauthorizedPerson,
            AlertKind::UnauthorizedPerson { faces_detected },
            0.0,
            details,
            camera_id,
            CameraRole::Door,
        )
        .with_assessment(assessment)
    }

    fn build(
        category: AlertCategory,
        kind: AlertKind,
        confidence: f64,
        details: Details,
        camera_id: &str,
        camera_role: CameraRole,
    ) -> Self {
        let message = messages::humanize(&category, &kind, confidence);
        Self {
            id: Uuid::new_v4(),
            category,
            kind,
            confidence,
            message,
            details,
            camera_id: camera_id.to_string(),
            camera_role,
            timestamp: Utc::now(),
            assessment: None,
        }
    }

    fn with_assessment(mut self, assessment: ThreatAssessment) -> Self {
        self.assessment = Some(assessment);
        self
    }

    /// Security events at a door are never throttled.
    pub fn is_throttle_exempt(&self) -> bool {
        self.category == AlertCategory::UnauthorizedPerson && self.camera_role == CameraRole::Door
    }

    /// Key under which repeats of this alert are throttled. The throttle is
    /// per camera, so the category alone is enough.
    pub fn throttle_key(&self) -> String {
        self.category.to_string()
    }
}
