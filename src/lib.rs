// quicksetup/src/lib.rs
use std::path::{Path, PathBuf};

pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod process_manager;
pub mod setup_manager;

use config::{default_config_path, ConfigRepository, IniConfigRepository, SetupConfig};
use error::SetupError;
use setup_manager::{event_channel, ExamplesDownloader, PythonEnv, SetupController};

fn log_dir_for(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("logs")
}

/// Process entry: load the config, open the interactive console, and leave
/// any still-running tasks behind on exit.
pub fn run() -> Result<(), SetupError> {
    let app_start_time = std::time::Instant::now();
    let config_path = default_config_path();

    let log_file = logging::init_logging(&log_dir_for(&config_path), logging::level_from_env())?;
    log::info!("======= QUICKSETUP STARTUP =======");
    log::info!("[STARTUP] OS: {}, Arch: {}", std::env::consts::OS, std::env::consts::ARCH);
    log::info!("[STARTUP] Current directory: {:?}", std::env::current_dir());
    log::info!("[STARTUP] Config file: {}", config_path.display());
    log::info!("[STARTUP] Log file: {}", log_file.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| SetupError::Io(format!("Failed to create Tokio runtime: {}", e)))?;

    let repository = IniConfigRepository::new(config_path);
    let config = repository.load().unwrap_or_else(|e| {
        log::warn!("[STARTUP] Could not load configuration ({}), using defaults", e);
        SetupConfig::default()
    });
    log::info!("[STARTUP] Loaded configuration: {:?}", config);

    let result = runtime.block_on(async move {
        let (sink, events) = event_channel();
        let controller = SetupController::new(Box::new(repository), sink, PythonEnv::default(), ExamplesDownloader::new()?);
        console::run_console(controller, config, events).await;
        Ok::<(), SetupError>(())
    });

    // Background tasks are detached; exiting does not wait for them.
    runtime.shutdown_background();
    log::info!("[LIFECYCLE] Application exiting - total runtime: {:?}", app_start_time.elapsed());
    result
}
