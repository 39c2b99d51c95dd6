//! Alerts, their messages and repeat suppression.
//!
//! Components:
//! - `types`: the `Alert` envelope, categories and threat assessments.
//! - `messages`: per-category message templates with a generic fallback.
//! - `throttle`: per-camera, per-category repeat suppression.

pub mod messages;
pub mod throttle;
pub mod types;

pub use throttle::AlertThrottle;
pub use types::{Alert, AlertCategory, AlertKind, Details, ThreatAssessment, ThreatLevel};
