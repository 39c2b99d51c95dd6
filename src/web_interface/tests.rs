use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;
use warp::http::StatusCode;

use crate::archival::clip_archive::testing::RecordingArchive;
use crate::archival::dispatcher::ClipDispatcher;
use crate::archival::trigger::ClipTrigger;
use crate::camera_management::CameraRegistry;
use crate::capture::PipelineServices;
use crate::collaborators::attendance::ShiftAttendanceRecorder;
use crate::collaborators::directory::InMemoryEmployeeDirectory;
use crate::configuration::config::Config;
use crate::configuration::types::{CameraConfig, CameraRole};
use crate::frame_source::adapter::testing::{fast_settings, ScriptedBackend};
use crate::frame_source::adapter::FrameSourceAdapter;
use crate::recognition::adapter::testing::ScriptedMatcher;
use crate::recognition::adapter::RecognitionAdapter;

use super::stream::{mjpeg_parts, part};
use super::WebServer;

fn registry(backend: ScriptedBackend, cameras: Vec<CameraConfig>) -> Arc<CameraRegistry> {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = Config {
        cameras,
        ..Config::default()
    };
    let directory = Arc::new(InMemoryEmployeeDirectory::new());
    let dispatcher = Arc::new(
        ClipDispatcher::start(Arc::new(RecordingArchive::default()), 4).unwrap(),
    );
    let services = Arc::new(PipelineServices {
        recognition: RecognitionAdapter::new(
            Arc::new(ScriptedMatcher::never_matching(0)),
            directory.clone(),
            vec![0.6],
        ),
        attendance: Arc::new(ShiftAttendanceRecorder::new(directory)),
        clips: Arc::new(ClipTrigger::new(dispatcher, &config.archive)),
    });
    let adapter = FrameSourceAdapter::new(Arc::new(backend), fast_settings());
    Arc::new(CameraRegistry::new(&config, adapter, services))
}

fn camera(id: &str) -> CameraConfig {
    CameraConfig {
        camera_id: id.to_string(),
        name: "Lobby".to_string(),
        source: "0".to_string(),
        location: "Ground floor".to_string(),
        role: CameraRole::Activity,
    }
}

fn server(registry: &Arc<CameraRegistry>) -> WebServer {
    WebServer::new(registry.clone(), &Config::default().server)
}

fn body(response: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

#[tokio::test]
async fn test_list_and_add_cameras() {
    let registry = registry(ScriptedBackend::streaming(), vec![camera("cam-1")]);
    let routes = server(&registry).routes();

    let response = warp::test::request()
        .method("GET")
        .path("/api/cameras")
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body(&response);
    assert_eq!(listed[0]["camera_id"], "cam-1");
    assert_eq!(listed[0]["role"], "activity");
    assert_eq!(listed[0]["is_active"], false);

    let response = warp::test::request()
        .method("POST")
        .path("/api/cameras")
        .json(&serde_json::json!({
            "camera_id": "door-1",
            "name": "Front door",
            "source": "rtsp://10.0.0.5/live",
            "camera_type": "door"
        }))
        .reply(&routes)
        .await;
    assert_eq!(body(&response)["success"], true);
    assert_eq!(registry.list().len(), 2);

    let response = warp::test::request()
        .method("POST")
        .path("/api/cameras")
        .json(&serde_json::json!({ "camera_id": "door-1" }))
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let failure = body(&response);
    assert_eq!(failure["success"], false);
    assert_eq!(failure["message"], "Camera ID 'door-1' already exists");
}

#[tokio::test]
async fn test_operational_failures_are_structured() {
    let registry = registry(ScriptedBackend::streaming(), vec![camera("cam-1")]);
    let routes = server(&registry).routes();

    let response = warp::test::request()
        .method("POST")
        .path("/api/cameras/ghost/start")
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(&response)["success"], false);

    let response = warp::test::request()
        .method("POST")
        .path("/api/cameras/cam-1/stop")
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let failure = body(&response);
    assert_eq!(failure["success"], false);
    assert_eq!(failure["message"], "Camera 'cam-1' not running");
}

#[tokio::test]
async fn test_start_stats_alerts_stop() {
    let registry = registry(ScriptedBackend::streaming(), vec![camera("cam-1")]);
    let routes = server(&registry).routes();

    let response = warp::test::request()
        .method("POST")
        .path("/api/cameras/cam-1/start")
        .reply(&routes)
        .await;
    assert_eq!(
        body(&response)["message"],
        "Camera cam-1 started successfully"
    );

    let stats = body(
        &warp::test::request()
            .path("/api/cameras/cam-1/stats")
            .reply(&routes)
            .await,
    );
    assert_eq!(stats["running"], true);
    assert_eq!(stats["fps"], 60);

    let alerts = body(
        &warp::test::request()
            .path("/api/cameras/cam-1/alerts")
            .reply(&routes)
            .await,
    );
    assert!(alerts["alert"].is_null());

    let status = body(
        &warp::test::request()
            .path("/api/cameras/status/quick")
            .reply(&routes)
            .await,
    );
    assert_eq!(status["active_count"], 1);
    assert_eq!(status["total_cameras"], 1);

    let response = warp::test::request()
        .method("POST")
        .path("/api/cameras/cam-1/stop")
        .reply(&routes)
        .await;
    assert_eq!(body(&response)["success"], true);

    let stats = body(
        &warp::test::request()
            .path("/api/cameras/cam-1/stats")
            .reply(&routes)
            .await,
    );
    assert_eq!(stats["running"], false);
    assert_eq!(stats["frame_count"], 0);
    assert_eq!(stats["buffer_size"], 0);
}

#[tokio::test]
async fn test_recent_alerts_and_summary_shapes() {
    let registry = registry(ScriptedBackend::streaming(), vec![camera("cam-1")]);
    let routes = server(&registry).routes();

    let recent = body(
        &warp::test::request()
            .path("/api/cameras/alerts/recent")
            .reply(&routes)
            .await,
    );
    assert_eq!(recent["count"], 0);
    assert!(recent["alerts"].as_array().unwrap().is_empty());

    let summary = body(
        &warp::test::request()
            .path("/api/cameras/security/summary")
            .reply(&routes)
            .await,
    );
    assert_eq!(
        summary["summary"],
        "Security Status: 0 cameras active, 0 recent alerts"
    );
}

#[tokio::test]
async fn test_delete_and_info() {
    let registry = registry(ScriptedBackend::streaming(), vec![camera("cam-1")]);
    let routes = server(&registry).routes();

    let info = body(
        &warp::test::request()
            .path("/api/cameras/cam-1/info")
            .reply(&routes)
            .await,
    );
    assert_eq!(info["location"], "Ground floor");
    assert_eq!(info["is_active"], false);

    let response = warp::test::request()
        .method("DELETE")
        .path("/api/cameras/cam-1")
        .reply(&routes)
        .await;
    assert_eq!(body(&response)["message"], "Camera cam-1 deleted");

    let info = body(
        &warp::test::request()
            .path("/api/cameras/cam-1/info")
            .reply(&routes)
            .await,
    );
    assert_eq!(info["success"], false);
}

#[tokio::test]
async fn test_source_probe_endpoint() {
    let registry = registry(ScriptedBackend::streaming(), Vec::new());
    let routes = server(&registry).routes();

    let probe = body(
        &warp::test::request()
            .method("POST")
            .path("/api/cameras/test-source")
            .json(&serde_json::json!({ "source": "rtsp://10.0.0.5/live" }))
            .reply(&routes)
            .await,
    );
    assert_eq!(probe["success"], true);
    assert_eq!(probe["width"], 32);
    assert_eq!(probe["height"], 24);

    let refusing = self::registry(ScriptedBackend::refusing(), Vec::new());
    let routes = server(&refusing).routes();
    let probe = body(
        &warp::test::request()
            .method("POST")
            .path("/api/cameras/test-source")
            .json(&serde_json::json!({ "source": "rtsp://10.0.0.5/live" }))
            .reply(&routes)
            .await,
    );
    assert_eq!(probe["success"], false);
}

#[tokio::test]
async fn test_attendance_endpoints() {
    let registry = registry(ScriptedBackend::streaming(), Vec::new());
    let routes = server(&registry).routes();

    let today = body(
        &warp::test::request()
            .path("/api/cameras/attendance/E1/today")
            .reply(&routes)
            .await,
    );
    assert_eq!(today, serde_json::json!({}));

    let month = body(
        &warp::test::request()
            .path("/api/cameras/attendance/E1/month/2026/3")
            .reply(&routes)
            .await,
    );
    assert_eq!(month["total_days"], 0);

    let invalid = body(
        &warp::test::request()
            .path("/api/cameras/attendance/E1/month/2026/13")
            .reply(&routes)
            .await,
    );
    assert_eq!(invalid["success"], false);
}

#[tokio::test]
async fn test_rejections_are_json() {
    let registry = registry(ScriptedBackend::streaming(), Vec::new());
    let routes = server(&registry).routes();

    let response = warp::test::request()
        .path("/api/nothing")
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(&response)["message"], "Not found");

    let response = warp::test::request()
        .method("POST")
        .path("/api/cameras")
        .header("content-type", "application/json")
        .body("{not json")
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stream_of_inactive_camera_is_not_found() {
    let registry = registry(ScriptedBackend::streaming(), vec![camera("cam-1")]);
    let routes = server(&registry).routes();
    let response = warp::test::request()
        .path("/api/cameras/cam-1/stream")
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mjpeg_parts_follow_camera_lifetime() {
    let registry = registry(ScriptedBackend::streaming(), vec![camera("cam-1")]);
    let starter = registry.clone();
    tokio::task::spawn_blocking(move || starter.start("cam-1"))
        .await
        .unwrap()
        .unwrap();

    let mut parts = Box::pin(mjpeg_parts(registry.clone(), "cam-1".to_string(), 1000, 80));
    let first = parts.next().await.unwrap().unwrap();
    let header = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
    assert!(first.starts_with(header));
    assert_eq!(&first[header.len()..header.len() + 2], &[0xFF, 0xD8]);
    assert!(first.ends_with(b"\r\n"));

    let stopper = registry.clone();
    tokio::task::spawn_blocking(move || stopper.stop("cam-1"))
        .await
        .unwrap()
        .unwrap();
    assert!(parts.next().await.is_none());
}

#[test]
fn test_part_framing() {
    let chunk = part(&[1, 2, 3]);
    assert_eq!(
        chunk,
        b"--frame\r\nContent-Type: image/jpeg\r\n\r\n\x01\x02\x03\r\n".to_vec()
    );
}

#[test]
fn test_server_stops_on_shutdown_signal() {
    let registry = registry(ScriptedBackend::streaming(), Vec::new());
    let server = server(&registry);
    let addr: std::net::SocketAddr = "127.0.0.1:0".parse().unwrap();
    let served = tokio_test::block_on(server.start(addr, async {}));
    assert!(served.is_ok());
}

#[test]
fn test_server_reports_bind_failure() {
    let registry = registry(ScriptedBackend::streaming(), Vec::new());
    let server = server(&registry);
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap();
    let served = tokio_test::block_on(server.start(addr, async {}));
    assert!(matches!(
        served,
        Err(crate::error_handling::types::WebError::BindFailed(_))
    ));
}
