//! Per-camera capture pipeline.
//!
//! Components:
//! - `camera_session`: shared per-camera state, frame slot and alert mailbox.
//! - `frame_history`: fixed-capacity rolling frame history.
//! - `failure_tracker`: consecutive read-failure and error counters.
//! - `processor`: subsampled recognition / behavior analysis and alert delivery.
//! - `capture_loop`: camera start-up with init timeout and the capture thread.

pub mod camera_session;
pub mod capture_loop;
pub mod failure_tracker;
pub mod frame_history;
pub mod processor;

#[cfg(test)]
mod tests;

pub use camera_session::{CameraSession, CameraState, SessionStats};
pub use capture_loop::{launch, LoopSettings};
pub use frame_history::FrameHistory;
pub use processor::{FrameProcessor, PipelineServices};
