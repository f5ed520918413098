// quicksetup/src/logging.rs
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::LevelFilter;
use once_cell::sync::OnceCell;

use crate::error::SetupError;

/// Overrides the log level (`error`, `warn`, `info`, `debug`, `trace`).
pub const LOG_LEVEL_ENV: &str = "QUICKSETUP_LOG";
pub const LOG_FILE_NAME: &str = "quicksetup.log";

static LOG_FILE: OnceCell<PathBuf> = OnceCell::new();

// File-only: stdout belongs to the interactive log view.
const LOG4RS_TEMPLATE: &str = r#"
appenders:
  file:
    kind: file
    path: '{path}'
    append: true
    encoder:
      pattern: "{d(%Y-%m-%d %H:%M:%S%.3f)} {l:<5} {t} - {m}{n}"
root:
  level: {level}
  appenders:
    - file
"#;

fn render_config(log_file: &Path, level: LevelFilter) -> String {
    // Single-quoted YAML: backslashes stay literal, quotes are doubled.
    let path = log_file.to_string_lossy().replace('\'', "''");
    LOG4RS_TEMPLATE
        .replace("{path}", &path)
        .replace("{level}", &level.to_string().to_lowercase())
}

pub fn level_from_env() -> LevelFilter {
    std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|v| LevelFilter::from_str(v.trim()).ok())
        .unwrap_or(LevelFilter::Info)
}

/// Starts log4rs writing to `<log_dir>/quicksetup.log`. Calling it again
/// returns the file chosen the first time.
pub fn init_logging(log_dir: &Path, level: LevelFilter) -> Result<PathBuf, SetupError> {
    LOG_FILE
        .get_or_try_init(|| {
            std::fs::create_dir_all(log_dir)
                .map_err(|e| SetupError::Config(format!("Failed to create log directory {}: {}", log_dir.display(), e)))?;
            let log_file = log_dir.join(LOG_FILE_NAME);
            let raw: log4rs::config::RawConfig = serde_yaml::from_str(&render_config(&log_file, level))
                .map_err(|e| SetupError::Config(format!("Invalid logging config: {}", e)))?;
            log4rs::config::init_raw_config(raw)
                .map_err(|e| SetupError::Config(format!("Failed to initialise logging: {}", e)))?;
            log::info!("[STARTUP] Logging to {} at level {}", log_file.display(), level);
            Ok(log_file)
        })
        .cloned()
}
