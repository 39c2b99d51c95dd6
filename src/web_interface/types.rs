use serde::{Deserialize, Serialize};

use crate::alerting::types::Alert;
use crate::camera_management::types::SourceProbe;
use crate::collaborators::types::DailyAttendance;

/// Error payload for rejected requests.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
}

/// Outcome of an operational request.
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationResponse {
    pub success: bool,
    pub message: String,
}

impl OperationResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub alert: Option<Alert>,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub count: usize,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Serialize)]
pub struct MonthlyAttendanceResponse {
    pub total_days: usize,
    pub records: Vec<DailyAttendance>,
}

#[derive(Debug, Deserialize)]
pub struct ProbeRequest {
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub probe: SourceProbe,
}
