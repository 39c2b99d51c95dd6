use std::sync::Arc;

use log::{error, warn};
use serde::Serialize;
use warp::reply::Response;
use warp::{reply, Filter, Rejection, Reply};

use super::types::{
    AlertResponse, AlertsResponse, MonthlyAttendanceResponse, OperationResponse, ProbeRequest,
    ProbeResponse,
};
use crate::camera_management::CameraRegistry;
use crate::configuration::types::CameraConfig;
use crate::error_handling::types::CameraError;

/// A registry call panicked or was cancelled.
#[derive(Debug)]
pub struct TaskFailed;

impl warp::reject::Reject for TaskFailed {}

/// Runs a registry call on the blocking pool. Starting a camera can wait
/// for its init timeout, so registry calls never run on the reactor.
async fn blocking<T, F>(registry: &Arc<CameraRegistry>, task: F) -> Result<T, Rejection>
where
    F: FnOnce(&CameraRegistry) -> T + Send + 'static,
    T: Send + 'static,
{
    let registry = Arc::clone(registry);
    tokio::task::spawn_blocking(move || task(&registry))
        .await
        .map_err(|e| {
            error!("Registry task failed: {}", e);
            warp::reject::custom(TaskFailed)
        })
}

fn json<T: Serialize>(value: &T) -> Response {
    reply::json(value).into_response()
}

fn outcome(result: Result<String, CameraError>) -> Response {
    match result {
        Ok(message) => json(&OperationResponse::ok(message)),
        Err(e) => {
            warn!("Camera request failed: {}", e);
            json(&OperationResponse::failed(e.to_string()))
        }
    }
}

fn with_registry(
    registry: Arc<CameraRegistry>,
) -> impl Filter<Extract = (Arc<CameraRegistry>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || registry.clone())
}

/// POST /api/cameras
pub fn add_camera_route(
    registry: Arc<CameraRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "cameras")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_registry(registry))
        .and_then(|camera: CameraConfig, registry: Arc<CameraRegistry>| async move {
            let camera_id = camera.camera_id.clone();
            let result = blocking(&registry, move |r| r.add(camera)).await?;
            Ok::<_, Rejection>(outcome(
                result.map(|_| format!("Camera {} added", camera_id)),
            ))
        })
}

/// GET /api/cameras
pub fn list_cameras_route(
    registry: Arc<CameraRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "cameras")
        .and(warp::get())
        .and(with_registry(registry))
        .and_then(|registry: Arc<CameraRegistry>| async move {
            let cameras = blocking(&registry, |r| r.list()).await?;
            Ok::<_, Rejection>(json(&cameras))
        })
}

/// POST /api/cameras/:id/start
pub fn start_camera_route(
    registry: Arc<CameraRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "cameras" / String / "start")
        .and(warp::post())
        .and(with_registry(registry))
        .and_then(|camera_id: String, registry: Arc<CameraRegistry>| async move {
            let id = camera_id.clone();
            let result = blocking(&registry, move |r| r.start(&id)).await?;
            Ok::<_, Rejection>(outcome(
                result.map(|_| format!("Camera {} started successfully", camera_id)),
            ))
        })
}

/// POST /api/cameras/:id/stop
pub fn stop_camera_route(
    registry: Arc<CameraRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "cameras" / String / "stop")
        .and(warp::post())
        .and(with_registry(registry))
        .and_then(|camera_id: String, registry: Arc<CameraRegistry>| async move {
            let id = camera_id.clone();
            let result = blocking(&registry, move |r| r.stop(&id)).await?;
            Ok::<_, Rejection>(outcome(
                result.map(|_| format!("Camera {} stopped", camera_id)),
            ))
        })
}

/// DELETE /api/cameras/:id
pub fn delete_camera_route(
    registry: Arc<CameraRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "cameras" / String)
        .and(warp::delete())
        .and(with_registry(registry))
        .and_then(|camera_id: String, registry: Arc<CameraRegistry>| async move {
            let id = camera_id.clone();
            let result = blocking(&registry, move |r| r.delete(&id)).await?;
            Ok::<_, Rejection>(outcome(
                result.map(|_| format!("Camera {} deleted", camera_id)),
            ))
        })
}

/// GET /api/cameras/:id/stats
pub fn camera_stats_route(
    registry: Arc<CameraRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "cameras" / String / "stats")
        .and(warp::get())
        .and(with_registry(registry))
        .and_then(|camera_id: String, registry: Arc<CameraRegistry>| async move {
            let result = blocking(&registry, move |r| r.get_stats(&camera_id)).await?;
            Ok::<_, Rejection>(match result {
                Ok(stats) => json(&stats),
                Err(e) => json(&OperationResponse::failed(e.to_string())),
            })
        })
}

/// GET /api/cameras/:id/alerts
///
/// Reading the alert consumes it.
pub fn camera_alerts_route(
    registry: Arc<CameraRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "cameras" / String / "alerts")
        .and(warp::get())
        .and(with_registry(registry))
        .and_then(|camera_id: String, registry: Arc<CameraRegistry>| async move {
            let alert = blocking(&registry, move |r| r.get_latest_alert(&camera_id)).await?;
            Ok::<_, Rejection>(json(&AlertResponse { alert }))
        })
}

/// GET /api/cameras/:id/info
pub fn camera_info_route(
    registry: Arc<CameraRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "cameras" / String / "info")
        .and(warp::get())
        .and(with_registry(registry))
        .and_then(|camera_id: String, registry: Arc<CameraRegistry>| async move {
            let result = blocking(&registry, move |r| r.info(&camera_id)).await?;
            Ok::<_, Rejection>(match result {
                Ok(info) => json(&info),
                Err(e) => json(&OperationResponse::failed(e.to_string())),
            })
        })
}

/// GET /api/cameras/alerts/recent
pub fn recent_alerts_route(
    registry: Arc<CameraRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "cameras" / "alerts" / "recent")
        .and(warp::get())
        .and(with_registry(registry))
        .and_then(|registry: Arc<CameraRegistry>| async move {
            let alerts = blocking(&registry, |r| r.recent_alerts()).await?;
            Ok::<_, Rejection>(json(&AlertsResponse {
                count: alerts.len(),
                alerts,
            }))
        })
}

/// GET /api/cameras/status/quick
pub fn quick_status_route(
    registry: Arc<CameraRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "cameras" / "status" / "quick")
        .and(warp::get())
        .and(with_registry(registry))
        .and_then(|registry: Arc<CameraRegistry>| async move {
            let status = blocking(&registry, |r| r.quick_status()).await?;
            Ok::<_, Rejection>(json(&status))
        })
}

/// GET /api/cameras/security/summary
pub fn security_summary_route(
    registry: Arc<CameraRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "cameras" / "security" / "summary")
        .and(warp::get())
        .and(with_registry(registry))
        .and_then(|registry: Arc<CameraRegistry>| async move {
            let summary = blocking(&registry, |r| r.security_summary()).await?;
            Ok::<_, Rejection>(json(&summary))
        })
}

/// POST /api/cameras/test-source
pub fn test_source_route(
    registry: Arc<CameraRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "cameras" / "test-source")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_registry(registry))
        .and_then(|request: ProbeRequest, registry: Arc<CameraRegistry>| async move {
            let result = blocking(&registry, move |r| r.probe_source(&request.source)).await?;
            Ok::<_, Rejection>(match result {
                Ok(probe) => json(&ProbeResponse {
                    success: true,
                    message: format!("Source readable at {}x{}", probe.width, probe.height),
                    probe,
                }),
                Err(e) => json(&OperationResponse::failed(e.to_string())),
            })
        })
}

/// GET /api/cameras/attendance/:employee_id/today
pub fn attendance_today_route(
    registry: Arc<CameraRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "cameras" / "attendance" / String / "today")
        .and(warp::get())
        .and(with_registry(registry))
        .and_then(|employee_id: String, registry: Arc<CameraRegistry>| async move {
            let today = blocking(&registry, move |r| r.attendance_today(&employee_id)).await?;
            Ok::<_, Rejection>(match today {
                Some(day) => json(&day),
                None => json(&serde_json::json!({})),
            })
        })
}

/// GET /api/cameras/attendance/:employee_id/month/:year/:month
pub fn attendance_month_route(
    registry: Arc<CameraRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "cameras" / "attendance" / String / "month" / i32 / u32)
        .and(warp::get())
        .and(with_registry(registry))
        .and_then(
            |employee_id: String, year: i32, month: u32, registry: Arc<CameraRegistry>| async move {
                if !(1..=12).contains(&month) {
                    return Ok::<_, Rejection>(json(&OperationResponse::failed(format!(
                        "Invalid month {}",
                        month
                    ))));
                }
                let records =
                    blocking(&registry, move |r| r.attendance_month(&employee_id, year, month))
                        .await?;
                Ok::<_, Rejection>(json(&MonthlyAttendanceResponse {
                    total_days: records.len(),
                    records,
                }))
            },
        )
}
