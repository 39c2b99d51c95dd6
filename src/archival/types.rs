use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alerting::types::Details;
use crate::frame_source::types::SharedFrame;

/// Frames and context handed to the archive for one event.
///
/// Built when an alert fires and discarded once dispatched; nothing retries
/// a clip that failed to save.
#[derive(Debug, Clone)]
pub struct ClipRequest {
    pub frames: Vec<SharedFrame>,
    pub camera_id: String,
    pub event_type: String,
    pub metadata: Details,
    /// JPEG bytes.
    pub thumbnail: Option<Vec<u8>>,
}

impl ClipRequest {
    /// Takes the last `window` frames of `history`, oldest first.
    pub fn from_window(
        history: &[SharedFrame],
        window: usize,
        camera_id: &str,
        event_type: &str,
        metadata: Details,
    ) -> Self {
        let start = history.len().saturating_sub(window);
        Self {
            frames: history[start..].to_vec(),
            camera_id: camera_id.to_string(),
            event_type: event_type.to_string(),
            metadata,
            thumbnail: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: Option<Vec<u8>>) -> Self {
        self.thumbnail = thumbnail;
        self
    }
}

/// Stored description of a saved clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRecord {
    pub clip_id: String,
    pub camera_id: String,
    pub event_type: String,
    pub frame_count: usize,
    pub duration_seconds: f64,
    pub created_at: DateTime<Utc>,
    pub has_thumbnail: bool,
    pub metadata: Details,
}

/// Clip search criteria; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipFilter {
    pub camera_id: Option<String>,
    /// Substring of the event type.
    pub event_type: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl ClipFilter {
    pub fn matches(&self, clip: &ClipRecord) -> bool {
        if let Some(ref camera) = self.camera_id {
            if &clip.camera_id != camera {
                return false;
            }
        }
        if let Some(ref event) = self.event_type {
            if !clip.event_type.contains(event.as_str()) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if clip.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if clip.created_at > until {
                return false;
            }
        }
        true
    }
}
