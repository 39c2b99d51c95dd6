use serde::{Deserialize, Serialize};

use crate::error_handling::types::RecognitionError;

/// Result of one recognition attempt at one threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched {
        employee_id: String,
        name: String,
        confidence: f64,
    },
    NoMatch {
        reason: String,
    },
}

/// External face matching service.
///
/// Frames are passed JPEG-encoded. Calls are independent; the matcher's
/// own enrollment data is not managed here.
pub trait FaceMatcher: Send + Sync {
    fn recognize(&self, jpeg: &[u8], threshold: f64) -> Result<MatchOutcome, RecognitionError>;

    /// Number of faces visible in the frame, matched or not.
    fn count_faces(&self, jpeg: &[u8]) -> Result<u32, RecognitionError>;
}

/// Used when no face matching service is configured: nothing is ever
/// recognized and no faces are ever detected.
pub struct DisabledFaceMatcher;

impl FaceMatcher for DisabledFaceMatcher {
    fn recognize(&self, _jpeg: &[u8], _threshold: f64) -> Result<MatchOutcome, RecognitionError> {
        Ok(MatchOutcome::NoMatch {
            reason: "face recognition disabled".to_string(),
        })
    }

    fn count_faces(&self, _jpeg: &[u8]) -> Result<u32, RecognitionError> {
        Ok(0)
    }
}
