//! Background clip persistence.
//!
//! Requests go through a bounded queue to a single worker thread that calls
//! the archive. Submitting never blocks: when the queue is full the request
//! is dropped with a warning.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use log::{error, info, warn};
use serde::Serialize;

use crate::error_handling::types::ArchiveError;

use super::clip_archive::ClipArchive;
use super::types::ClipRequest;

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    saved: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub submitted: u64,
    pub saved: u64,
    pub failed: u64,
    pub dropped: u64,
}

pub struct ClipDispatcher {
    sender: Mutex<Option<SyncSender<ClipRequest>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl ClipDispatcher {
    pub fn start(archive: Arc<dyn ClipArchive>, capacity: usize) -> Result<Self, ArchiveError> {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let counters = Arc::new(Counters::default());
        let worker = {
            let counters = Arc::clone(&counters);
            thread::Builder::new()
                .name("clip-archiver".into())
                .spawn(move || run_worker(archive, receiver, &counters))
                .map_err(|e| ArchiveError::WriteFailed(e.to_string()))?
        };
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            counters,
        })
    }

    /// Queues a clip for saving.
    pub fn dispatch(&self, request: ClipRequest) -> Result<(), ArchiveError> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = guard.as_ref().ok_or(ArchiveError::Closed)?;
        match sender.try_send(request) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(request)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "[{}] Clip queue full, dropping {} clip",
                    request.camera_id, request.event_type
                );
                Err(ArchiveError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(ArchiveError::Closed),
        }
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            saved: self.counters.saved.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Stops accepting clips, lets the worker drain the queue and joins it.
    pub fn shutdown(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                error!("Clip archiver thread panicked");
            }
            info!("Clip archiver stopped");
        }
    }
}

impl Drop for ClipDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(archive: Arc<dyn ClipArchive>, receiver: Receiver<ClipRequest>, counters: &Counters) {
    for request in receiver {
        match archive.save(&request) {
            Ok(clip_id) => {
                counters.saved.fetch_add(1, Ordering::Relaxed);
                info!(
                    "[{}] Clip {} archived as {}",
                    request.camera_id, request.event_type, clip_id
                );
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    "[{}] Failed to archive {} clip: {}",
                    request.camera_id, request.event_type, e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::types::Details;
    use crate::archival::clip_archive::testing::RecordingArchive;
    use crate::frame_source::types::Frame;
    use image::RgbImage;
    use std::time::Duration;

    fn request(event: &str) -> ClipRequest {
        let frames = vec![Arc::new(Frame::new(RgbImage::new(4, 4)))];
        ClipRequest::from_window(&frames, 1, "cam-1", event, Details::new())
    }

    #[test]
    fn test_dispatched_clips_reach_archive() {
        let archive = Arc::new(RecordingArchive::default());
        let dispatcher = ClipDispatcher::start(archive.clone(), 4).unwrap();
        dispatcher.dispatch(request("activity_idle")).unwrap();
        dispatcher.dispatch(request("activity_absence")).unwrap();
        let saved = archive.wait_for(2, Duration::from_secs(2));
        assert_eq!(saved.len(), 2);
        dispatcher.shutdown();
        assert_eq!(dispatcher.stats().saved, 2);
    }

    #[test]
    fn test_archive_failures_are_counted_not_raised() {
        let archive = Arc::new(RecordingArchive::failing());
        let dispatcher = ClipDispatcher::start(archive, 4).unwrap();
        dispatcher.dispatch(request("door_unauthorized_person")).unwrap();
        dispatcher.shutdown();
        let stats = dispatcher.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.saved, 0);
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let archive = Arc::new(RecordingArchive {
            delay: Duration::from_millis(200),
            ..RecordingArchive::default()
        });
        let dispatcher = ClipDispatcher::start(archive, 1).unwrap();
        let results: Vec<_> = (0..5)
            .map(|_| dispatcher.dispatch(request("activity_idle")))
            .collect();
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(ArchiveError::QueueFull))));
        assert!(dispatcher.stats().dropped >= 1);
    }

    #[test]
    fn test_dispatch_after_shutdown_is_closed() {
        let dispatcher = ClipDispatcher::start(Arc::new(RecordingArchive::default()), 1).unwrap();
        dispatcher.shutdown();
        assert!(matches!(
            dispatcher.dispatch(request("x")),
            Err(ArchiveError::Closed)
        ));
    }
}
