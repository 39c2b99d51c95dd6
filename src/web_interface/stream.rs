//! MJPEG streaming of a camera's current frame.
//!
//! Frames are pulled from the camera's single-slot buffer only when the
//! client is ready for the next part, so a slow client skips frames instead
//! of queueing them. The rate is capped by a skipping interval timer.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, Stream};
use log::{debug, warn};
use tokio::time::{interval, Interval, MissedTickBehavior};
use warp::http::{Response, StatusCode};
use warp::hyper::Body;
use warp::{reply, Filter, Rejection, Reply};

use super::types::ApiError;
use crate::camera_management::CameraRegistry;
use crate::frame_source::types::SharedFrame;

pub const BOUNDARY: &str = "frame";

struct StreamState {
    registry: Arc<CameraRegistry>,
    camera_id: String,
    ticker: Interval,
    last: Option<SharedFrame>,
    quality: u8,
}

/// Wraps one JPEG as a multipart part.
pub fn part(jpeg: &[u8]) -> Vec<u8> {
    let mut chunk = Vec::with_capacity(jpeg.len() + 64);
    chunk.extend_from_slice(format!("--{}\r\nContent-Type: image/jpeg\r\n\r\n", BOUNDARY).as_bytes());
    chunk.extend_from_slice(jpeg);
    chunk.extend_from_slice(b"\r\n");
    chunk
}

/// Multipart parts for as long as the camera keeps running.
pub fn mjpeg_parts(
    registry: Arc<CameraRegistry>,
    camera_id: String,
    fps: u32,
    quality: u8,
) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> + Send + 'static {
    let mut ticker = interval(Duration::from_secs_f64(1.0 / fps.max(1) as f64));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let state = StreamState {
        registry,
        camera_id,
        ticker,
        last: None,
        quality,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            state.ticker.tick().await;
            if !state.registry.is_active(&state.camera_id) {
                debug!("[{}] Stream ended, camera not running", state.camera_id);
                return None;
            }
            let Some(frame) = state.registry.get_frame(&state.camera_id) else {
                continue;
            };
            if state
                .last
                .as_ref()
                .map_or(false, |last| Arc::ptr_eq(last, &frame))
            {
                continue;
            }
            state.last = Some(Arc::clone(&frame));

            let quality = state.quality;
            match tokio::task::spawn_blocking(move || frame.to_jpeg(quality)).await {
                Ok(Ok(jpeg)) => return Some((Ok(part(&jpeg)), state)),
                Ok(Err(e)) => warn!("[{}] JPEG encoding failed: {}", state.camera_id, e),
                Err(e) => warn!("[{}] JPEG encoding task failed: {}", state.camera_id, e),
            }
        }
    })
}

/// GET /api/cameras/:id/stream
pub fn stream_route(
    registry: Arc<CameraRegistry>,
    quality: u8,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "cameras" / String / "stream")
        .and(warp::get())
        .and_then(move |camera_id: String| {
            let registry = registry.clone();
            async move {
                if !registry.is_active(&camera_id) {
                    return Ok::<_, Rejection>(
                        reply::with_status(
                            reply::json(&ApiError {
                                message: format!("Camera {} not active", camera_id),
                            }),
                            StatusCode::NOT_FOUND,
                        )
                        .into_response(),
                    );
                }

                let fps = registry.stream_fps();
                let body = Body::wrap_stream(mjpeg_parts(registry, camera_id, fps, quality));
                let response = Response::builder()
                    .header(
                        "Content-Type",
                        format!("multipart/x-mixed-replace; boundary={}", BOUNDARY),
                    )
                    .header("Cache-Control", "no-cache, no-store, must-revalidate")
                    .header("Pragma", "no-cache")
                    .header("Expires", "0")
                    .body(body);
                Ok::<_, Rejection>(match response {
                    Ok(response) => response.into_response(),
                    Err(e) => reply::with_status(
                        reply::json(&ApiError {
                            message: e.to_string(),
                        }),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    )
                    .into_response(),
                })
            }
        })
}
