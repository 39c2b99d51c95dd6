//! Opening frame sources with the per-kind attempt budget and capture hints.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::configuration::types::CaptureConfig;
use crate::error_handling::types::CaptureError;

use super::types::{CaptureHints, Frame, SourceDescriptor};

/// An opened capture handle.
pub trait FrameSource: Send {
    /// Returns the freshest frame available, discarding anything older that
    /// was buffered in the meantime. `Ok(None)` means no frame arrived within
    /// the backend's read timeout.
    fn grab(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Releases the underlying device or connection. Safe to call twice.
    fn release(&mut self);
}

/// Knows how to turn a descriptor into a live [`FrameSource`].
pub trait SourceBackend: Send + Sync {
    fn connect(
        &self,
        descriptor: &SourceDescriptor,
        hints: &CaptureHints,
    ) -> Result<Box<dyn FrameSource>, CaptureError>;
}

/// A source that produced at least one frame during initialization.
pub struct OpenedSource {
    pub source: Box<dyn FrameSource>,
    pub first_frame: Frame,
}

#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub network_attempts: u32,
    pub connect_backoff: Duration,
    pub local_fps_hint: u32,
    pub width: u32,
    pub height: u32,
    pub network_init_timeout: Duration,
    pub local_init_timeout: Duration,
}

impl From<&CaptureConfig> for AdapterSettings {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            network_attempts: config.network_connect_attempts,
            connect_backoff: config.connect_backoff(),
            local_fps_hint: config.local_fps_hint,
            width: config.frame_width,
            height: config.frame_height,
            network_init_timeout: config.init_timeout(true),
            local_init_timeout: config.init_timeout(false),
        }
    }
}

/// Isolates device and protocol quirks from the capture loop.
///
/// Network sources get low-latency transport hints and several attempts to
/// deliver a first frame, since streams often lag right after the handshake.
/// Local sources get a single attempt with frame rate and resolution hints.
/// On failure the handle is always released before the error is returned.
#[derive(Clone)]
pub struct FrameSourceAdapter {
    backend: Arc<dyn SourceBackend>,
    settings: AdapterSettings,
}

impl FrameSourceAdapter {
    pub fn new(backend: Arc<dyn SourceBackend>, settings: AdapterSettings) -> Self {
        Self { backend, settings }
    }

    /// Upper bound on how long a caller waits for [`open`](Self::open).
    pub fn init_timeout(&self, descriptor: &SourceDescriptor) -> Duration {
        if descriptor.is_network() {
            self.settings.network_init_timeout
        } else {
            self.settings.local_init_timeout
        }
    }

    pub fn hints_for(&self, descriptor: &SourceDescriptor) -> CaptureHints {
        if descriptor.is_network() {
            CaptureHints {
                fps: None,
                width: self.settings.width,
                height: self.settings.height,
                low_latency: true,
            }
        } else {
            CaptureHints {
                fps: Some(self.settings.local_fps_hint),
                width: self.settings.width,
                height: self.settings.height,
                low_latency: false,
            }
        }
    }

    pub fn open(&self, descriptor: &SourceDescriptor) -> Result<OpenedSource, CaptureError> {
        self.open_while(descriptor, || true)
    }

    /// Opens `descriptor`, giving up early once `keep_going` turns false.
    pub fn open_while<F>(
        &self,
        descriptor: &SourceDescriptor,
        keep_going: F,
    ) -> Result<OpenedSource, CaptureError>
    where
        F: Fn() -> bool,
    {
        let hints = self.hints_for(descriptor);
        info!("Opening source {} ({:?})", descriptor, hints);

        let mut source = self.backend.connect(descriptor, &hints).map_err(|e| match e {
            CaptureError::BackendUnavailable(_) => e,
            other => CaptureError::ConnectionError(format!(
                "Cannot connect to {}: {}",
                descriptor, other
            )),
        })?;

        let attempts = if descriptor.is_network() {
            self.settings.network_attempts.max(1)
        } else {
            1
        };

        for attempt in 1..=attempts {
            if !keep_going() {
                source.release();
                return Err(CaptureError::ConnectionError(format!(
                    "Initialization of {} abandoned",
                    descriptor
                )));
            }
            match source.grab() {
                Ok(Some(frame)) => {
                    debug!(
                        "Source {} delivered a {}x{} frame on attempt {}",
                        descriptor,
                        frame.width(),
                        frame.height(),
                        attempt
                    );
                    return Ok(OpenedSource {
                        source,
                        first_frame: frame,
                    });
                }
                Ok(None) => {
                    debug!(
                        "Attempt {}/{} - waiting for frames from {}",
                        attempt, attempts, descriptor
                    );
                }
                Err(CaptureError::StreamClosed) => {
                    warn!("Source {} closed before delivering a frame", descriptor);
                    break;
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{} on {} failed: {}",
                        attempt, attempts, descriptor, e
                    );
                }
            }
            if attempt < attempts {
                thread::sleep(self.settings.connect_backoff);
            }
        }

        source.release();
        Err(CaptureError::ConnectionError(format!(
            "Connected to {} but no video stream after {} attempt(s)",
            descriptor, attempts
        )))
    }

    /// Opens a source once, reports the first frame's dimensions and releases it.
    pub fn probe(&self, descriptor: &SourceDescriptor) -> Result<(u32, u32), CaptureError> {
        let mut opened = self.open(descriptor)?;
        let dimensions = (opened.first_frame.width(), opened.first_frame.height());
        opened.source.release();
        Ok(dimensions)
    }
}
