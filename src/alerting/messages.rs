//! Human-readable alert messages.

use super::types::{AlertCategory, AlertKind};

/// Renders the message for an alert. Categories without a template get a
/// generic message naming the category.
pub fn humanize(category: &AlertCategory, kind: &AlertKind, confidence: f64) -> String {
    match (category, kind) {
        (
            AlertCategory::AttendanceRecorded,
            AlertKind::Attendance {
                name, direction, ..
            },
        ) => format!(
            "{} recorded {} (confidence: {:.2})",
            name, direction, confidence
        ),
        (AlertCategory::UnauthorizedPerson, AlertKind::UnauthorizedPerson { faces_detected }) => {
            format!(
                "Unauthorized person at the door - {} unrecognized face(s)",
                faces_detected
            )
        }
        _ => template(category, confidence),
    }
}

fn template(category: &AlertCategory, confidence: f64) -> String {
    match category {
        AlertCategory::Idle => format!(
            "Employee sitting idle - no productive activity detected (confidence: {:.2})",
            confidence
        ),
        AlertCategory::Wandering => format!(
            "Employee wandering around - repeated movement away from the desk (confidence: {:.2})",
            confidence
        ),
        AlertCategory::Absence => format!(
            "Workstation unattended - no one present (confidence: {:.2})",
            confidence
        ),
        AlertCategory::Timepass => format!(
            "Employee making timepass - using phone at desk (confidence: {:.2})",
            confidence
        ),
        AlertCategory::Loitering => format!(
            "Loitering near restricted area - possible non-working behavior (confidence: {:.2})",
            confidence
        ),
        AlertCategory::Chatting => format!(
            "Extended chatting detected - possible time wastage (confidence: {:.2})",
            confidence
        ),
        AlertCategory::Suspicious => format!(
            "Suspicious behavior detected - requires attention (confidence: {:.2})",
            confidence
        ),
        other => format!(
            "Unusual behavior detected: {} (confidence: {:.2})",
            other, confidence
        ),
    }
}
