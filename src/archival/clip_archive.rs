//! Clip Archive interface.
//!
//! Implementors persist clips and answer queries over them. Callers on the
//! capture path treat every error as non-fatal.

use chrono::{DateTime, Utc};

use crate::error_handling::types::ArchiveError;

use super::types::{ClipFilter, ClipRecord, ClipRequest};

pub trait ClipArchive: Send + Sync {
    /// Persists a clip and returns its id.
    fn save(&self, request: &ClipRequest) -> Result<String, ArchiveError>;

    /// Clips matching `filter`, newest first.
    fn search(&self, filter: &ClipFilter) -> Result<Vec<ClipRecord>, ArchiveError>;

    fn describe(&self, clip_id: &str) -> Result<ClipRecord, ArchiveError>;

    fn delete(&self, clip_id: &str) -> Result<(), ArchiveError>;

    /// Deletes clips created before `cutoff`, returning how many were removed.
    fn cleanup_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, ArchiveError>;
}
