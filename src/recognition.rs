//! Face recognition for door cameras.
//!
//! Components:
//! - `face_matcher`: the `FaceMatcher` seam and a disabled implementation.
//! - `http_matcher`: blocking HTTP client for an external matching service.
//! - `adapter`: threshold escalation, directory enrichment, fault absorption.

pub mod adapter;
pub mod face_matcher;
pub mod http_matcher;

pub use adapter::{RecognitionAdapter, Recognized};
pub use face_matcher::{DisabledFaceMatcher, FaceMatcher, MatchOutcome};
pub use http_matcher::HttpFaceMatcher;
