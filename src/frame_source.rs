//! Frame source adapter.
//!
//! Components:
//! - `types`: decoded frames and source descriptors.
//! - `adapter`: the `FrameSource`/`SourceBackend` seams and the attempt budget
//!   applied when opening a source.
//! - `ffmpeg`: production backend decoding devices and network streams
//!   through an ffmpeg child process.

pub mod adapter;
pub mod ffmpeg;
pub mod types;

pub use adapter::{AdapterSettings, FrameSource, FrameSourceAdapter, OpenedSource, SourceBackend};
pub use ffmpeg::FfmpegBackend;
pub use types::{encode_jpeg, CaptureHints, Frame, SharedFrame, SourceDescriptor};
