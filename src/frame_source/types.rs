//! Frame and source descriptor types shared by the capture subsystem.

use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, ImageResult, RgbImage};
use std::fmt;
use std::sync::Arc;

/// A single decoded RGB frame with its capture time.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            captured_at: Utc::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn to_jpeg(&self, quality: u8) -> ImageResult<Vec<u8>> {
        encode_jpeg(&self.image, quality)
    }

    /// JPEG of the frame scaled to exactly `width` x `height`.
    pub fn thumbnail_jpeg(&self, width: u32, height: u32, quality: u8) -> ImageResult<Vec<u8>> {
        let scaled = imageops::resize(&self.image, width, height, FilterType::Triangle);
        encode_jpeg(&scaled, quality)
    }
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> ImageResult<Vec<u8>> {
    let mut buffer = Vec::with_capacity(image.as_raw().len() / 8);
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode(
        image.as_raw(),
        image.width(),
        image.height(),
        ColorType::Rgb8,
    )?;
    Ok(buffer)
}

/// Frames are immutable once captured and shared between the display slot,
/// the rolling history and clip requests.
pub type SharedFrame = Arc<Frame>;

/// Where a camera's frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    /// Local capture device, by index (`0` → `/dev/video0`).
    DeviceIndex(u32),
    /// Local capture device, by path.
    DevicePath(String),
    /// Network stream (`rtsp://`, `rtsps://`, `http://` MJPEG, ...).
    Network(String),
}

impl SourceDescriptor {
    /// Interprets a configured source string.
    pub fn parse(source: &str) -> Self {
        let source = source.trim();
        if let Ok(index) = source.parse::<u32>() {
            SourceDescriptor::DeviceIndex(index)
        } else if source.contains("://") {
            SourceDescriptor::Network(source.to_string())
        } else {
            SourceDescriptor::DevicePath(source.to_string())
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, SourceDescriptor::Network(_))
    }

    pub fn is_rtsp(&self) -> bool {
        match self {
            SourceDescriptor::Network(uri) => {
                let lower = uri.to_ascii_lowercase();
                lower.starts_with("rtsp://") || lower.starts_with("rtsps://")
            }
            _ => false,
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDescriptor::DeviceIndex(index) => write!(f, "device #{}", index),
            SourceDescriptor::DevicePath(path) => write!(f, "{}", path),
            SourceDescriptor::Network(uri) => write!(f, "{}", redact_credentials(uri)),
        }
    }
}

/// Best-effort capture settings passed to the backend when opening a source.
///
/// Local devices honour the frame rate and resolution only if the hardware
/// supports them; the actual values are only known once frames are read.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureHints {
    pub fps: Option<u32>,
    pub width: u32,
    pub height: u32,
    /// Request TCP transport and a short reordering delay for RTSP.
    pub low_latency: bool,
}

/// Strips `user:password@` from a URI so it can be logged.
fn redact_credentials(uri: &str) -> String {
    match (uri.find("://"), uri.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &uri[..scheme_end], &uri[at + 1..])
        }
        _ => uri.to_string(),
    }
}
