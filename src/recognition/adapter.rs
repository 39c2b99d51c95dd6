use std::sync::Arc;

use image::RgbImage;
use log::{debug, info, warn};
use serde::Serialize;

use crate::collaborators::traits::EmployeeDirectory;
use crate::frame_source::types::encode_jpeg;

use super::face_matcher::{FaceMatcher, MatchOutcome};

const RECOGNITION_JPEG_QUALITY: u8 = 90;

/// A positive identification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recognized {
    pub employee_id: String,
    pub name: String,
    pub confidence: f64,
    pub threshold: f64,
}

/// Wraps the face matcher with threshold escalation.
///
/// Thresholds are tried in ascending order of lenience and the first match
/// wins. A failure at one threshold is logged and the next one is tried.
/// Nothing escapes: every fault degrades to "no match".
#[derive(Clone)]
pub struct RecognitionAdapter {
    matcher: Arc<dyn FaceMatcher>,
    directory: Arc<dyn EmployeeDirectory>,
    thresholds: Vec<f64>,
}

impl RecognitionAdapter {
    pub fn new(
        matcher: Arc<dyn FaceMatcher>,
        directory: Arc<dyn EmployeeDirectory>,
        thresholds: Vec<f64>,
    ) -> Self {
        Self {
            matcher,
            directory,
            thresholds,
        }
    }

    pub fn recognize(&self, frame: &RgbImage) -> Option<Recognized> {
        let jpeg = match encode_jpeg(frame, RECOGNITION_JPEG_QUALITY) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                warn!("Frame encoding for recognition failed: {}", e);
                return None;
            }
        };
        self.recognize_jpeg(&jpeg)
    }

    pub fn recognize_jpeg(&self, jpeg: &[u8]) -> Option<Recognized> {
        for &threshold in &self.thresholds {
            match self.matcher.recognize(jpeg, threshold) {
                Ok(MatchOutcome::Matched {
                    employee_id,
                    name,
                    confidence,
                }) => {
                    // directory name wins over whatever the matcher stored
                    let name = self
                        .directory
                        .get(&employee_id)
                        .map(|record| record.name)
                        .unwrap_or(name);
                    info!(
                        "Face recognized at threshold {}: {} ({:.2})",
                        threshold, name, confidence
                    );
                    return Some(Recognized {
                        employee_id,
                        name,
                        confidence,
                        threshold,
                    });
                }
                Ok(MatchOutcome::NoMatch { reason }) => {
                    debug!("No match at threshold {}: {}", threshold, reason);
                }
                Err(e) => {
                    warn!("Face recognition error at threshold {}: {}", threshold, e);
                }
            }
        }
        debug!("No face recognized at any threshold");
        None
    }

    /// Faces visible in the frame; 0 when detection fails.
    pub fn count_faces(&self, frame: &RgbImage) -> u32 {
        let counted = encode_jpeg(frame, RECOGNITION_JPEG_QUALITY)
            .map_err(|e| e.to_string())
            .and_then(|jpeg| self.matcher.count_faces(&jpeg).map_err(|e| e.to_string()));
        match counted {
            Ok(faces) => faces,
            Err(e) => {
                warn!("Face detection failed: {}", e);
                0
            }
        }
    }
}
