use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use log::{error, info, warn};

use vigil::archival::{ClipArchive, ClipDispatcher, ClipTrigger, FileClipArchive};
use vigil::camera_management::CameraRegistry;
use vigil::capture::PipelineServices;
use vigil::collaborators::{InMemoryEmployeeDirectory, ShiftAttendanceRecorder};
use vigil::configuration::{Config, ConfigOverrides};
use vigil::error_handling::WebError;
use vigil::frame_source::{AdapterSettings, FfmpegBackend, FrameSourceAdapter};
use vigil::recognition::{DisabledFaceMatcher, FaceMatcher, HttpFaceMatcher, RecognitionAdapter};
use vigil::web_interface::WebServer;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(version)]
#[command(about = "Door attendance and activity monitoring over live cameras")]
struct Args {
    /// TOML configuration file
    config_file: PathBuf,

    /// Address the HTTP API listens on
    #[arg(long, env = "VIGIL_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Port the HTTP API listens on
    #[arg(long, env = "VIGIL_PORT")]
    port: Option<u16>,

    /// Directory where clips are archived
    #[arg(long, env = "VIGIL_STORAGE_PATH")]
    storage_path: Option<PathBuf>,
}

fn main() {
    // RUST_LOG takes precedence over the default level
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .init();

    let args = Args::parse();

    info!("Importing configuration");
    let mut config = Config::from_file(&args.config_file).unwrap_or_else(|e| {
        error!("Unable to import configuration from file: {}", e);
        std::process::exit(1);
    });
    config.apply_overrides(ConfigOverrides {
        bind_address: args.bind_address,
        port: args.port,
        storage_path: args.storage_path,
    });
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }
    info!(
        "Configuration imported successfully: {} camera(s), {} employee(s)",
        config.cameras.len(),
        config.employees.len()
    );

    if let Err(e) = run(config) {
        error!("{}, exiting...", e);
        std::process::exit(1);
    }
}

/// Builds every component, serves until Ctrl-C, then shuts down in order:
/// HTTP server, cameras, clip worker.
///
/// The blocking HTTP client of the face matcher must not be created or
/// dropped on the async runtime, so construction and teardown happen here
/// and only the server runs inside `block_on`.
fn run(config: Config) -> Result<(), Box<dyn Error>> {
    let archive = Arc::new(FileClipArchive::new(
        &config.archive.storage_path,
        config.archive.clip_fps,
    )?);
    let cutoff = Utc::now() - chrono::Duration::days(i64::from(config.archive.retention_days));
    if let Err(e) = archive.cleanup_older_than(cutoff) {
        warn!("Retention cleanup failed: {}", e);
    }
    let dispatcher = Arc::new(ClipDispatcher::start(
        archive,
        config.archive.queue_capacity,
    )?);

    let directory = Arc::new(InMemoryEmployeeDirectory::from_configs(&config.employees)?);
    let attendance = Arc::new(ShiftAttendanceRecorder::new(directory.clone()));
    let matcher: Arc<dyn FaceMatcher> = match &config.recognition.service_url {
        Some(url) => {
            info!("Face recognition service at {}", url);
            Arc::new(HttpFaceMatcher::new(
                url,
                config.recognition.request_timeout(),
            )?)
        }
        None => {
            warn!("No face recognition service configured, door cameras will not recognize anyone");
            Arc::new(DisabledFaceMatcher)
        }
    };

    let services = Arc::new(PipelineServices {
        recognition: RecognitionAdapter::new(
            matcher,
            directory,
            config.recognition.thresholds.clone(),
        ),
        attendance,
        clips: Arc::new(ClipTrigger::new(dispatcher.clone(), &config.archive)),
    });
    let backend = Arc::new(FfmpegBackend::new(
        config.capture.ffmpeg_path.clone(),
        config.capture.read_timeout(),
    ));
    let adapter = FrameSourceAdapter::new(backend, AdapterSettings::from(&config.capture));
    let registry = Arc::new(CameraRegistry::new(&config, adapter, services));

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .map_err(|e| {
            WebError::InvalidAddress(format!(
                "{}:{} ({})",
                config.server.bind_address, config.server.port, e
            ))
        })?;
    let server = WebServer::new(registry.clone(), &config.server);

    let runtime = tokio::runtime::Runtime::new()?;
    let served = runtime.block_on(server.start(addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
    }));
    drop(server);
    runtime.shutdown_timeout(Duration::from_secs(5));

    registry.stop_all();
    dispatcher.shutdown();
    let stats = dispatcher.stats();
    info!(
        "Clip archival finished: {} saved, {} failed, {} dropped",
        stats.saved, stats.failed, stats.dropped
    );

    served?;
    Ok(())
}
