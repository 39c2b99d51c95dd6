//! Clip archival.
//!
//! Components:
//! - `types`: `ClipRequest`, stored `ClipRecord` and `ClipFilter`.
//! - `clip_archive`: the `ClipArchive` interface.
//! - `file_archive`: directory-per-clip archive on the local filesystem.
//! - `dispatcher`: bounded queue and worker thread calling the archive.
//! - `trigger`: alert → clip request, window selection by severity.

pub mod clip_archive;
pub mod dispatcher;
pub mod file_archive;
pub mod trigger;
pub mod types;

pub use clip_archive::ClipArchive;
pub use dispatcher::{ClipDispatcher, DispatchStats};
pub use file_archive::FileClipArchive;
pub use trigger::ClipTrigger;
pub use types::{ClipFilter, ClipRecord, ClipRequest};
