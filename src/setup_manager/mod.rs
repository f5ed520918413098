// quicksetup/src/setup_manager/mod.rs

pub mod archive_utils;
pub mod command_runner;
pub mod event_utils;
pub mod examples_downloader;
pub mod orchestration;
pub mod python_env;
pub mod types;

pub use command_runner::{CommandLine, CommandRunner, PreparedCommand, ShellFamily};
pub use event_utils::{event_channel, EventSink};
pub use examples_downloader::{ExamplesDownloader, ARCHIVE_FILE_NAME};
pub use orchestration::SetupController;
pub use python_env::{mirror_options, PipAction, PythonEnv, PACKAGE_NAME, VENV_NAME};
pub use types::{NoticeLevel, SetupEvent, TaskId, TaskKind};
