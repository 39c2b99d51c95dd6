//! Behavior analysis for activity cameras.
//!
//! Components:
//! - `background`: adaptive per-pixel background model producing foreground masks.
//! - `morphology`: mask cleanup and connected-region extraction.
//! - `analyzer`: the stateful idle/wandering/absence classifier.

pub mod analyzer;
pub mod background;
pub mod morphology;

pub use analyzer::{BehaviorAnalyzer, BehaviorCategory, BehaviorFinding, Observation, PersonProxy};
pub use background::BackgroundModel;
pub use morphology::{Mask, Region};
