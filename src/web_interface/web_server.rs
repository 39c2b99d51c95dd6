use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use super::routes::*;
use super::stream::stream_route;
use super::types::ApiError;
use crate::camera_management::CameraRegistry;
use crate::configuration::types::ServerConfig;
use crate::error_handling::types::WebError;

/// Web server for the camera HTTP API
pub struct WebServer {
    registry: Arc<CameraRegistry>,
    stream_quality: u8,
}

impl WebServer {
    pub fn new(registry: Arc<CameraRegistry>, config: &ServerConfig) -> Self {
        Self {
            registry,
            stream_quality: config.stream_jpeg_quality,
        }
    }

    /// Every route, with rejections turned into JSON errors.
    pub fn routes(&self) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
        let registry = &self.registry;

        // Fixed paths first so they are not taken for camera ids
        let fixed = recent_alerts_route(registry.clone())
            .or(quick_status_route(registry.clone()))
            .or(security_summary_route(registry.clone()))
            .or(test_source_route(registry.clone()))
            .or(attendance_today_route(registry.clone()))
            .or(attendance_month_route(registry.clone()));

        let cameras = add_camera_route(registry.clone())
            .or(list_cameras_route(registry.clone()))
            .or(start_camera_route(registry.clone()))
            .or(stop_camera_route(registry.clone()))
            .or(delete_camera_route(registry.clone()))
            .or(camera_stats_route(registry.clone()))
            .or(camera_alerts_route(registry.clone()))
            .or(camera_info_route(registry.clone()))
            .or(stream_route(registry.clone(), self.stream_quality));

        fixed.or(cameras).recover(handle_rejection)
    }

    /// Serves until `shutdown` resolves.
    pub async fn start(
        &self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), WebError> {
        let (bound, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .map_err(|e| {
                error!("Unable to bind {}: {}", addr, e);
                WebError::BindFailed(e.to_string())
            })?;
        info!("Web server listening on http://{}", bound);
        server.await;
        info!("Web server stopped");
        Ok(())
    }
}

/// Turns rejections into JSON error bodies.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else if err.find::<TaskFailed>().is_some() {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Request could not be completed".to_string(),
        )
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };
    Ok(reply::with_status(reply::json(&ApiError { message }), status))
}
