// quicksetup/src/setup_manager/types.rs
use std::fmt;

use uuid::Uuid;

/// Ephemeral id of a background task. Only used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        TaskId(Uuid::new_v4())
    }

    /// First block of the uuid, enough to tell concurrent tasks apart in a log.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    CreateVenv,
    Install,
    Update,
    DownloadExamples,
}

impl TaskKind {
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::CreateVenv => "create-venv",
            TaskKind::Install => "install",
            TaskKind::Update => "update",
            TaskKind::DownloadExamples => "download-examples",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// What background tasks (and the controller) tell the interactive surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupEvent {
    /// One line for the log view. `task` is `None` for controller messages.
    Log { task: Option<TaskId>, line: String },
    /// A message the user has to see (the desktop version used a dialog).
    Notice { level: NoticeLevel, title: String, message: String },
    TaskFinished { task: TaskId, kind: TaskKind, success: bool },
    ClearLog,
}
