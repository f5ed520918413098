// quicksetup/src/error.rs
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a setup action. None of these are fatal to the
/// process; they end the task that hit them.
#[derive(Debug, Error)]
pub enum SetupError {
    /// No working directory has been chosen yet.
    #[error("No working directory selected. Please choose a working directory first.")]
    ConfigMissing,

    /// Update requested before the virtual environment was created.
    #[error("Virtual environment '{}' does not exist. Please install first.", venv_path.display())]
    EnvironmentMissing { venv_path: PathBuf },

    /// Child process exited with a non-zero code (or was killed by a signal).
    #[error("Operation failed with exit code: {}", code.map_or_else(|| "terminated by signal".to_string(), |c| c.to_string()))]
    CommandFailed { code: Option<i32> },

    #[error("Failed to start command: {0}")]
    Spawn(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Extraction failed: {0}")]
    Archive(String),

    #[error("Invalid download source: {0}")]
    InvalidSource(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SetupError {
    /// Refusals (a precondition was not met, nothing was attempted) are shown
    /// as warnings; everything else is an error.
    pub fn is_refusal(&self) -> bool {
        matches!(self, SetupError::ConfigMissing | SetupError::EnvironmentMissing { .. })
    }
}

impl From<std::io::Error> for SetupError {
    fn from(e: std::io::Error) -> Self {
        SetupError::Io(e.to_string())
    }
}
