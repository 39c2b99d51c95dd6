//! HTTP surface of the camera registry.
//!
//! JSON endpoints under `/api/cameras` plus an MJPEG stream per camera.
//! Operational failures (unknown camera, not running, unreachable source)
//! are answered with `{"success": false, "message": ...}` and status 200.

pub mod routes;
pub mod stream;
pub mod types;
pub mod web_server;

#[cfg(test)]
mod tests;

pub use types::*;
pub use web_server::WebServer;
