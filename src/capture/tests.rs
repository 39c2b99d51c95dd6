use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};

use crate::alerting::types::{Alert, AlertCategory, AlertKind, Details};
use crate::archival::clip_archive::testing::RecordingArchive;
use crate::archival::dispatcher::ClipDispatcher;
use crate::archival::trigger::ClipTrigger;
use crate::collaborators::directory::InMemoryEmployeeDirectory;
use crate::collaborators::traits::AttendanceRecorder;
use crate::collaborators::types::{AttendanceDirection, DailyAttendance};
use crate::configuration::types::{
    ArchiveConfig, BehaviorConfig, CameraConfig, CameraRole, CaptureConfig,
};
use crate::error_handling::types::{AttendanceError, CameraError};
use crate::frame_source::adapter::testing::{fast_settings, ScriptedBackend, Step};
use crate::frame_source::adapter::FrameSourceAdapter;
use crate::frame_source::types::Frame;
use crate::recognition::adapter::testing::{Answer, ScriptedMatcher};
use crate::recognition::adapter::RecognitionAdapter;

use super::camera_session::{CameraSession, CameraState};
use super::capture_loop::{launch, mirror, LoopSettings};
use super::processor::{FrameProcessor, PipelineServices};

struct AlwaysEntry;

impl AttendanceRecorder for AlwaysEntry {
    fn record(
        &self,
        _employee_id: &str,
        _camera_id: &str,
    ) -> Result<Option<AttendanceDirection>, AttendanceError> {
        Ok(Some(AttendanceDirection::Entry))
    }

    fn today(&self, _employee_id: &str) -> Option<DailyAttendance> {
        None
    }

    fn month(&self, _employee_id: &str, _year: i32, _month: u32) -> Vec<DailyAttendance> {
        Vec::new()
    }
}

struct Harness {
    archive: Arc<RecordingArchive>,
    matcher: Arc<ScriptedMatcher>,
    services: Arc<PipelineServices>,
}

fn harness(matcher: ScriptedMatcher) -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();
    let archive = Arc::new(RecordingArchive::default());
    let dispatcher = Arc::new(ClipDispatcher::start(archive.clone(), 16).unwrap());
    let mut archive_config = ArchiveConfig::default();
    archive_config.thumbnail_width = 16;
    archive_config.thumbnail_height = 12;
    let matcher = Arc::new(matcher);
    let services = Arc::new(PipelineServices {
        recognition: RecognitionAdapter::new(
            matcher.clone(),
            Arc::new(InMemoryEmployeeDirectory::new()),
            vec![0.6, 0.7, 0.8],
        ),
        attendance: Arc::new(AlwaysEntry),
        clips: Arc::new(ClipTrigger::new(dispatcher, &archive_config)),
    });
    Harness {
        archive,
        matcher,
        services,
    }
}

fn camera(id: &str, role: CameraRole) -> CameraConfig {
    CameraConfig {
        camera_id: id.to_string(),
        name: id.to_string(),
        source: "0".to_string(),
        location: "lab".to_string(),
        role,
    }
}

fn capture_config() -> CaptureConfig {
    CaptureConfig {
        failure_backoff_ms: 1,
        ..CaptureConfig::default()
    }
}

fn start(
    harness: &Harness,
    backend: Arc<ScriptedBackend>,
    role: CameraRole,
    behavior: &BehaviorConfig,
    capture: &CaptureConfig,
) -> (Arc<CameraSession>, Result<(), CameraError>) {
    let session = Arc::new(CameraSession::new(
        camera("cam-test", role),
        capture.history_capacity,
    ));
    let adapter = FrameSourceAdapter::new(backend, fast_settings());
    let processor = FrameProcessor::new(
        role,
        behavior,
        Duration::from_secs(60),
        harness.services.clone(),
    );
    let result = launch(
        &session,
        &adapter,
        processor,
        LoopSettings::for_role(capture, role),
    );
    (session, result)
}

fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_thirty_failed_reads_stop_camera_exactly_once() {
    let harness = harness(ScriptedMatcher::never_matching(0));
    let backend = Arc::new(ScriptedBackend::new(vec![Step::Frame(10)], Step::Empty));
    let (session, result) = start(
        &harness,
        backend.clone(),
        CameraRole::Activity,
        &BehaviorConfig::default(),
        &capture_config(),
    );
    result.unwrap();

    assert!(wait_until(|| session.state() == CameraState::Stopped));
    session.join_worker();
    assert_eq!(session.auto_stop_count(), 1);
    // one grab during initialization, then exactly thirty failed reads
    assert_eq!(backend.grabs.load(Ordering::SeqCst), 31);
    assert!(backend.released.load(Ordering::SeqCst));
    assert!(!session.auto_stop("again"));
    assert_eq!(session.auto_stop_count(), 1);
    assert!(session.last_error().unwrap().contains("30"));
}

#[test]
fn test_ten_capture_errors_stop_camera() {
    let harness = harness(ScriptedMatcher::never_matching(0));
    let backend = Arc::new(ScriptedBackend::new(vec![Step::Frame(10)], Step::Fail));
    let (session, result) = start(
        &harness,
        backend.clone(),
        CameraRole::Activity,
        &BehaviorConfig::default(),
        &capture_config(),
    );
    result.unwrap();

    assert!(wait_until(|| session.state() == CameraState::Stopped));
    session.join_worker();
    assert_eq!(backend.grabs.load(Ordering::SeqCst), 11);
    assert_eq!(session.auto_stop_count(), 1);
}

#[test]
fn test_successful_read_resets_failure_counters() {
    let harness = harness(ScriptedMatcher::never_matching(0));
    let mut steps = vec![Step::Frame(1)];
    for _ in 0..2 {
        steps.extend(std::iter::repeat(Step::Empty).take(29));
        steps.extend(std::iter::repeat(Step::Fail).take(9));
        steps.push(Step::Frame(1));
    }
    let backend = Arc::new(ScriptedBackend::new(steps, Step::Frame(2)));
    let (session, result) = start(
        &harness,
        backend.clone(),
        CameraRole::Activity,
        &BehaviorConfig::default(),
        &capture_config(),
    );
    result.unwrap();

    assert!(wait_until(|| session.frame_count() >= 20));
    assert!(session.is_running());
    assert!(session.request_stop());
    session.join_worker();
    assert_eq!(session.auto_stop_count(), 0);
    assert!(backend.released.load(Ordering::SeqCst));
    assert!(!session.request_stop());
}

#[test]
fn test_stop_is_observed_and_thread_joined() {
    let harness = harness(ScriptedMatcher::never_matching(0));
    let backend = Arc::new(ScriptedBackend::streaming());
    let (session, result) = start(
        &harness,
        backend.clone(),
        CameraRole::Activity,
        &BehaviorConfig::default(),
        &capture_config(),
    );
    result.unwrap();
    assert!(wait_until(|| session.frame_count() > 5));

    let stats = session.stats();
    assert!(stats.running);
    assert!(stats.buffer_size > 0);
    assert!(stats.buffer_size <= 300);

    session.request_stop();
    session.join_worker();
    let frames = session.frame_count();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(session.frame_count(), frames);
    assert!(backend.released.load(Ordering::SeqCst));
    assert!(session.latest_frame().is_some());
}

#[test]
fn test_refused_source_fails_start() {
    let harness = harness(ScriptedMatcher::never_matching(0));
    let (session, result) = start(
        &harness,
        Arc::new(ScriptedBackend::refusing()),
        CameraRole::Door,
        &BehaviorConfig::default(),
        &capture_config(),
    );
    assert!(matches!(result, Err(CameraError::Connection(_))));
    assert_eq!(session.state(), CameraState::Stopped);
    assert!(session.last_error().is_some());
}

#[test]
fn test_init_timeout_ignores_late_completion() {
    let harness = harness(ScriptedMatcher::never_matching(0));
    let mut backend = ScriptedBackend::streaming();
    backend.connect_delay = Duration::from_millis(300);
    let backend = Arc::new(backend);

    let session = Arc::new(CameraSession::new(camera("slow", CameraRole::Door), 300));
    let mut settings = fast_settings();
    settings.local_init_timeout = Duration::from_millis(50);
    let adapter = FrameSourceAdapter::new(backend.clone(), settings);
    let processor = FrameProcessor::new(
        CameraRole::Door,
        &BehaviorConfig::default(),
        Duration::from_secs(60),
        harness.services.clone(),
    );
    let result = launch(
        &session,
        &adapter,
        processor,
        LoopSettings::for_role(&capture_config(), CameraRole::Door),
    );
    assert!(matches!(result, Err(CameraError::InitTimeout { .. })));
    assert_eq!(session.state(), CameraState::Stopped);

    assert!(wait_until(|| backend.released.load(Ordering::SeqCst)));
    session.join_worker();
    assert_eq!(session.state(), CameraState::Stopped);
    assert_eq!(session.frame_count(), 0);
    assert_eq!(backend.grabs.load(Ordering::SeqCst), 0);
}

#[test]
fn test_door_camera_raises_unthrottled_unauthorized_alerts() {
    let harness = harness(ScriptedMatcher::never_matching(1));
    let steps = vec![Step::Frame(50); 25];
    let backend = Arc::new(ScriptedBackend::new(steps, Step::Closed));
    let (session, result) = start(
        &harness,
        backend,
        CameraRole::Door,
        &BehaviorConfig::default(),
        &capture_config(),
    );
    result.unwrap();
    assert!(wait_until(|| session.state() == CameraState::Stopped));
    session.join_worker();

    // frames 0, 10 and 20 are analyzed, each at three thresholds
    assert_eq!(harness.matcher.calls.lock().unwrap().len(), 9);
    let clips = harness.archive.wait_for(3, Duration::from_secs(2));
    assert_eq!(clips.len(), 3);
    assert!(clips
        .iter()
        .all(|clip| clip.event_type == "door_unauthorized_person"));

    let alert = session.take_alert().unwrap();
    assert_eq!(alert.category, AlertCategory::UnauthorizedPerson);
    assert!(matches!(
        alert.kind,
        AlertKind::UnauthorizedPerson { faces_detected: 1 }
    ));
    assert!(session.take_alert().is_none());
}

#[test]
fn test_door_camera_records_attendance_once_per_throttle_window() {
    let harness = harness(ScriptedMatcher::new(
        vec![(0.6, Answer::Match("E1", "Asha", 0.93))],
        1,
    ));
    let steps = vec![Step::Frame(50); 11];
    let backend = Arc::new(ScriptedBackend::new(steps, Step::Closed));
    let (session, result) = start(
        &harness,
        backend,
        CameraRole::Door,
        &BehaviorConfig::default(),
        &capture_config(),
    );
    result.unwrap();
    assert!(wait_until(|| session.state() == CameraState::Stopped));
    session.join_worker();

    let alert = session.take_alert().unwrap();
    assert_eq!(alert.category, AlertCategory::AttendanceRecorded);
    assert_eq!(alert.details["employee_id"], "E1");

    let clips = harness.archive.wait_for(2, Duration::from_millis(300));
    assert_eq!(clips.len(), 1);
    assert_eq!(clips[0].event_type, "door_attendance_recorded");
    assert_eq!(clips[0].frames.len(), 1);
}

#[test]
fn test_activity_camera_raises_idle_alert_with_clip() {
    let harness = harness(ScriptedMatcher::never_matching(0));
    let behavior = BehaviorConfig {
        warmup_samples: 3,
        idle_seconds: 0.05,
        ..BehaviorConfig::default()
    };
    let capture = CaptureConfig {
        activity_stride: 1,
        ..capture_config()
    };
    let steps = vec![Step::Frame(90); 8];
    let backend = Arc::new(ScriptedBackend::new(steps, Step::Closed));
    let (session, result) = start(&harness, backend, CameraRole::Activity, &behavior, &capture);
    result.unwrap();
    assert!(wait_until(|| session.state() == CameraState::Stopped));
    session.join_worker();

    let alert = session.take_alert().unwrap();
    assert_eq!(alert.category, AlertCategory::Idle);
    assert_eq!(alert.camera_role, CameraRole::Activity);
    assert_eq!(alert.confidence, 0.85);

    let clips = harness.archive.wait_for(2, Duration::from_millis(300));
    assert_eq!(clips.len(), 1);
    assert_eq!(clips[0].event_type, "activity_idle");
    assert_eq!(clips[0].frames.len(), 3);
    assert!(clips[0].thumbnail.is_some());
    // recognition never runs on activity cameras
    assert!(harness.matcher.calls.lock().unwrap().is_empty());
}

#[test]
fn test_latest_alert_read_is_destructive_and_overwrites() {
    let session = CameraSession::new(camera("cam-1", CameraRole::Activity), 10);
    let idle = Alert::behavior(
        AlertCategory::Idle,
        0.85,
        Details::new(),
        "cam-1",
        CameraRole::Activity,
    );
    let absence = Alert::behavior(
        AlertCategory::Absence,
        0.75,
        Details::new(),
        "cam-1",
        CameraRole::Activity,
    );

    assert!(session.post_alert(idle.clone()).is_none());
    assert_eq!(session.take_alert(), Some(idle.clone()));
    assert_eq!(session.take_alert(), None);

    session.post_alert(idle);
    let replaced = session.post_alert(absence.clone()).unwrap();
    assert_eq!(replaced.category, AlertCategory::Idle);
    assert_eq!(session.take_alert(), Some(absence));
}

#[test]
fn test_concurrent_post_and_take_never_lose_or_duplicate() {
    let session = Arc::new(CameraSession::new(camera("cam-1", CameraRole::Activity), 10));
    let producer = {
        let session = session.clone();
        thread::spawn(move || {
            for _ in 0..500 {
                session.post_alert(Alert::unauthorized(1, "cam-1"));
            }
        })
    };
    let mut seen = std::collections::HashSet::new();
    for _ in 0..500 {
        if let Some(alert) = session.take_alert() {
            assert!(seen.insert(alert.id));
        }
    }
    producer.join().unwrap();
    if let Some(alert) = session.take_alert() {
        assert!(seen.insert(alert.id));
    }
    assert!(session.take_alert().is_none());
}

#[test]
fn test_mirror_flips_horizontally() {
    let mut image = RgbImage::new(2, 1);
    image.put_pixel(0, 0, Rgb([255, 0, 0]));
    image.put_pixel(1, 0, Rgb([0, 0, 255]));
    let mut frame = Frame::new(image);
    mirror(&mut frame);
    assert_eq!(frame.image.get_pixel(0, 0), &Rgb([0, 0, 255]));
    assert_eq!(frame.image.get_pixel(1, 0), &Rgb([255, 0, 0]));
}

#[test]
fn test_loop_settings_follow_role() {
    let config = CaptureConfig::default();
    assert_eq!(LoopSettings::for_role(&config, CameraRole::Door).stride, 10);
    assert_eq!(LoopSettings::for_role(&config, CameraRole::Activity).stride, 45);
}
