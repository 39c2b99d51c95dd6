//! Filesystem-backed clip archive.
//!
//! Layout: `<root>/<clip_id>/frame_0000.jpg ...`, an optional
//! `thumbnail.jpg` and `clip.json`. `clip.json` is written last through a
//! rename, so a directory without it is an incomplete clip and is skipped.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::error_handling::types::ArchiveError;

use super::clip_archive::ClipArchive;
use super::types::{ClipFilter, ClipRecord, ClipRequest};

const RECORD_FILE: &str = "clip.json";
const THUMBNAIL_FILE: &str = "thumbnail.jpg";
const FRAME_JPEG_QUALITY: u8 = 85;

pub struct FileClipArchive {
    root: PathBuf,
    clip_fps: f64,
}

impl FileClipArchive {
    pub fn new<P: AsRef<Path>>(root: P, clip_fps: f64) -> Result<Self, ArchiveError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            error!("Failed to create clip directory {}: {}", root.display(), e);
            ArchiveError::WriteFailed(e.to_string())
        })?;
        info!("Clip archive initialized at {}", root.display());
        Ok(Self {
            root,
            clip_fps: if clip_fps > 0.0 { clip_fps } else { 10.0 },
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a clip directory, rejecting anything that is not a clip id.
    fn clip_dir(&self, clip_id: &str) -> Result<PathBuf, ArchiveError> {
        Uuid::parse_str(clip_id).map_err(|_| ArchiveError::NotFound(clip_id.to_string()))?;
        Ok(self.root.join(clip_id))
    }

    fn write_clip(&self, dir: &Path, record: &ClipRecord, request: &ClipRequest) -> Result<(), ArchiveError> {
        let write_err = |path: &Path, e: std::io::Error| {
            error!("Failed to write {}: {}", path.display(), e);
            ArchiveError::WriteFailed(e.to_string())
        };

        for (index, frame) in request.frames.iter().enumerate() {
            let path = dir.join(format!("frame_{:04}.jpg", index));
            let jpeg = frame.to_jpeg(FRAME_JPEG_QUALITY)?;
            fs::write(&path, jpeg).map_err(|e| write_err(&path, e))?;
        }
        if let Some(ref thumbnail) = request.thumbnail {
            let path = dir.join(THUMBNAIL_FILE);
            fs::write(&path, thumbnail).map_err(|e| write_err(&path, e))?;
        }

        let staging = dir.join(format!("{}.tmp", RECORD_FILE));
        let json = serde_json::to_vec_pretty(record)?;
        File::create(&staging)
            .and_then(|mut f| f.write_all(&json))
            .map_err(|e| write_err(&staging, e))?;
        let path = dir.join(RECORD_FILE);
        fs::rename(&staging, &path).map_err(|e| write_err(&path, e))
    }

    fn read_record(&self, dir: &Path) -> Result<ClipRecord, ArchiveError> {
        let path = dir.join(RECORD_FILE);
        let content = fs::read(&path).map_err(|e| {
            debug!("Cannot read {}: {}", path.display(), e);
            ArchiveError::ReadFailed(e.to_string())
        })?;
        serde_json::from_slice(&content).map_err(|e| {
            warn!("Corrupt clip record {}: {}", path.display(), e);
            ArchiveError::ReadFailed(e.to_string())
        })
    }

    fn all_records(&self) -> Result<Vec<ClipRecord>, ArchiveError> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            error!("Failed to read clip directory {}: {}", self.root.display(), e);
            ArchiveError::ReadFailed(e.to_string())
        })?;
        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                error!("Dir entry error: {}", e);
                ArchiveError::ReadFailed(e.to_string())
            })?;
            let path = entry.path();
            if path.is_dir() {
                if let Ok(record) = self.read_record(&path) {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }
}

impl ClipArchive for FileClipArchive {
    fn save(&self, request: &ClipRequest) -> Result<String, ArchiveError> {
        if request.frames.is_empty() {
            return Err(ArchiveError::EmptyClip);
        }
        let clip_id = Uuid::new_v4().to_string();
        let dir = self.root.join(&clip_id);
        fs::create_dir_all(&dir).map_err(|e| {
            error!("Failed to create clip dir {}: {}", dir.display(), e);
            ArchiveError::WriteFailed(e.to_string())
        })?;

        let record = ClipRecord {
            clip_id: clip_id.clone(),
            camera_id: request.camera_id.clone(),
            event_type: request.event_type.clone(),
            frame_count: request.frames.len(),
            duration_seconds: request.frames.len() as f64 / self.clip_fps,
            created_at: Utc::now(),
            has_thumbnail: request.thumbnail.is_some(),
            metadata: request.metadata.clone(),
        };

        if let Err(e) = self.write_clip(&dir, &record, request) {
            let _ = fs::remove_dir_all(&dir);
            return Err(e);
        }
        info!(
            "[{}] Saved clip {} ({}, {} frame(s))",
            request.camera_id, clip_id, request.event_type, record.frame_count
        );
        Ok(clip_id)
    }

    fn search(&self, filter: &ClipFilter) -> Result<Vec<ClipRecord>, ArchiveError> {
        let mut records = self.all_records()?;
        let total = records.len();
        records.retain(|record| filter.matches(record));
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        debug!("Loaded {} clip(s), {} after filter", total, records.len());
        Ok(records)
    }

    fn describe(&self, clip_id: &str) -> Result<ClipRecord, ArchiveError> {
        let dir = self.clip_dir(clip_id)?;
        if !dir.is_dir() {
            return Err(ArchiveError::NotFound(clip_id.to_string()));
        }
        self.read_record(&dir)
    }

    fn delete(&self, clip_id: &str) -> Result<(), ArchiveError> {
        let dir = self.clip_dir(clip_id)?;
        if !dir.is_dir() {
            return Err(ArchiveError::NotFound(clip_id.to_string()));
        }
        fs::remove_dir_all(&dir).map_err(|e| {
            error!("Failed to delete clip {}: {}", dir.display(), e);
            ArchiveError::WriteFailed(e.to_string())
        })?;
        info!("Deleted clip {}", clip_id);
        Ok(())
    }

    fn cleanup_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, ArchiveError> {
        let mut removed = 0;
        for record in self.all_records()? {
            if record.created_at < cutoff {
                match self.delete(&record.clip_id) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Retention cleanup skipped {}: {}", record.clip_id, e),
                }
            }
        }
        if removed > 0 {
            info!("Retention cleanup removed {} clip(s)", removed);
        }
        Ok(removed)
    }
}
