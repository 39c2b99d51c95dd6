//! Device and network capture through an `ffmpeg` child process.
//!
//! ffmpeg decodes the source and writes fixed-size `rgb24` frames to stdout.
//! A reader thread drains the pipe continuously and keeps only the newest
//! frame, so `grab()` always returns the freshest picture and never a stale
//! one queued behind it.

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use image::RgbImage;
use log::{debug, trace, warn};

use crate::error_handling::types::CaptureError;

use super::adapter::{FrameSource, SourceBackend};
use super::types::{CaptureHints, Frame, SourceDescriptor};

pub struct FfmpegBackend {
    binary: Option<PathBuf>,
    read_timeout: Duration,
}

impl FfmpegBackend {
    pub fn new(binary: Option<PathBuf>, read_timeout: Duration) -> Self {
        Self {
            binary,
            read_timeout,
        }
    }

    fn resolve_binary(&self) -> Result<PathBuf, CaptureError> {
        match &self.binary {
            Some(path) => Ok(path.clone()),
            None => which::which("ffmpeg").map_err(|e| {
                CaptureError::BackendUnavailable(format!("ffmpeg not found in PATH: {}", e))
            }),
        }
    }

    /// Builds the ffmpeg argument list for a source.
    pub fn build_args(descriptor: &SourceDescriptor, hints: &CaptureHints) -> Vec<String> {
        let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];

        match descriptor {
            SourceDescriptor::Network(uri) => {
                if descriptor.is_rtsp() && hints.low_latency {
                    args.extend(["-rtsp_transport", "tcp", "-max_delay", "500000"].map(String::from));
                }
                if hints.low_latency {
                    args.extend(["-fflags", "nobuffer", "-flags", "low_delay"].map(String::from));
                }
                args.push("-i".into());
                args.push(uri.clone());
            }
            SourceDescriptor::DeviceIndex(index) => {
                push_device_input(&mut args, format!("/dev/video{}", index), hints);
            }
            SourceDescriptor::DevicePath(path) => {
                push_device_input(&mut args, path.clone(), hints);
            }
        }

        args.push("-vf".into());
        args.push(format!("scale={}:{}", hints.width, hints.height));
        args.extend(["-an", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"].map(String::from));
        args
    }
}

fn push_device_input(args: &mut Vec<String>, device: String, hints: &CaptureHints) {
    args.extend(["-f", "v4l2"].map(String::from));
    if let Some(fps) = hints.fps {
        args.push("-framerate".into());
        args.push(fps.to_string());
    }
    args.push("-video_size".into());
    args.push(format!("{}x{}", hints.width, hints.height));
    args.push("-i".into());
    args.push(device);
}

impl SourceBackend for FfmpegBackend {
    fn connect(
        &self,
        descriptor: &SourceDescriptor,
        hints: &CaptureHints,
    ) -> Result<Box<dyn FrameSource>, CaptureError> {
        let binary = self.resolve_binary()?;
        let args = Self::build_args(descriptor, hints);
        debug!("Running {} for {}", binary.display(), descriptor);

        let mut child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let Some(stdout) = child.stdout.take() else {
            reap(&mut child);
            return Err(CaptureError::ConnectionError(
                "ffmpeg stdout was not captured".to_string(),
            ));
        };

        if let Some(stderr) = child.stderr.take() {
            let label = descriptor.to_string();
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    debug!("[ffmpeg {}] {}", label, line);
                }
            });
        }

        let latest = Arc::new(LatestFrame::default());
        let reader = {
            let latest = Arc::clone(&latest);
            let (width, height) = (hints.width, hints.height);
            let spawned = thread::Builder::new()
                .name("ffmpeg-reader".into())
                .spawn(move || read_frames(stdout, width, height, &latest));
            match spawned {
                Ok(reader) => reader,
                Err(e) => {
                    reap(&mut child);
                    return Err(e.into());
                }
            }
        };

        Ok(Box::new(FfmpegSource {
            child: Some(child),
            reader: Some(reader),
            latest,
            read_timeout: self.read_timeout,
        }))
    }
}

#[derive(Default)]
struct LatestFrame {
    slot: Mutex<FrameSlot>,
    ready: Condvar,
}

#[derive(Default)]
struct FrameSlot {
    frame: Option<Frame>,
    closed: bool,
    overwritten: u64,
}

impl LatestFrame {
    fn publish(&self, frame: Frame) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.frame.replace(frame).is_some() {
            slot.overwritten += 1;
        }
        self.ready.notify_one();
    }

    fn close(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.closed = true;
        self.ready.notify_all();
    }
}

fn read_frames(mut stdout: ChildStdout, width: u32, height: u32, latest: &LatestFrame) {
    let frame_len = width as usize * height as usize * 3;
    loop {
        let mut buffer = vec![0u8; frame_len];
        if let Err(e) = stdout.read_exact(&mut buffer) {
            debug!("ffmpeg stream ended: {}", e);
            break;
        }
        match RgbImage::from_raw(width, height, buffer) {
            Some(image) => latest.publish(Frame::new(image)),
            None => {
                warn!("ffmpeg produced a frame of unexpected size");
                break;
            }
        }
    }
    latest.close();
}

struct FfmpegSource {
    child: Option<Child>,
    reader: Option<JoinHandle<()>>,
    latest: Arc<LatestFrame>,
    read_timeout: Duration,
}

impl FrameSource for FfmpegSource {
    fn grab(&mut self) -> Result<Option<Frame>, CaptureError> {
        let slot = self
            .latest
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (mut slot, _) = self
            .latest
            .ready
            .wait_timeout_while(slot, self.read_timeout, |s| s.frame.is_none() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(frame) = slot.frame.take() {
            if slot.overwritten > 0 {
                trace!("Dropped {} stale frame(s)", slot.overwritten);
                slot.overwritten = 0;
            }
            return Ok(Some(frame));
        }
        if slot.closed {
            return Err(CaptureError::StreamClosed);
        }
        Ok(None)
    }

    fn release(&mut self) {
        if let Some(mut child) = self.child.take() {
            reap(&mut child);
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

/// Kills `child` and waits for it so no ffmpeg process outlives its source.
fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!("ffmpeg already exited: {}", e);
    }
    let _ = child.wait();
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.release();
    }
}
