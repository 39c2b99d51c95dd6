//! Blocking HTTP client for a face matching service.
//!
//! `POST {base}/recognize` takes `{"image": <base64 jpeg>, "threshold": t}`
//! and answers `{"recognized": bool, "employee_id", "name", "confidence",
//! "reason"}`. `POST {base}/detect` takes `{"image": ...}` and answers
//! `{"faces": n}`.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::error_handling::types::RecognitionError;

use super::face_matcher::{FaceMatcher, MatchOutcome};

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    image: &'a str,
    threshold: f64,
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    image: &'a str,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    recognized: bool,
    #[serde(default)]
    employee_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    faces: u32,
}

pub struct HttpFaceMatcher {
    http: Client,
    base_url: String,
}

impl HttpFaceMatcher {
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RecognitionError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R, RecognitionError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self.http.post(&url).json(body).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(RecognitionError::BadResponse(format!(
                "{} returned {}",
                url, status
            )));
        }
        Ok(response.json()?)
    }
}

impl FaceMatcher for HttpFaceMatcher {
    fn recognize(&self, jpeg: &[u8], threshold: f64) -> Result<MatchOutcome, RecognitionError> {
        let image = STANDARD.encode(jpeg);
        let response: RecognizeResponse =
            self.post("recognize", &RecognizeRequest { image: &image, threshold })?;
        debug!("recognize@{} -> {:?}", threshold, response);

        if !response.recognized {
            return Ok(MatchOutcome::NoMatch {
                reason: response.reason.unwrap_or_else(|| "no match".to_string()),
            });
        }
        let employee_id = response.employee_id.ok_or_else(|| {
            RecognitionError::BadResponse("match without employee_id".to_string())
        })?;
        Ok(MatchOutcome::Matched {
            name: response.name.unwrap_or_else(|| employee_id.clone()),
            employee_id,
            confidence: response.confidence.unwrap_or(0.0),
        })
    }

    fn count_faces(&self, jpeg: &[u8]) -> Result<u32, RecognitionError> {
        let image = STANDARD.encode(jpeg);
        let response: DetectResponse = self.post("detect", &DetectRequest { image: &image })?;
        Ok(response.faces)
    }
}
