// quicksetup/src/setup_manager/orchestration.rs
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use tokio::task::JoinHandle;

use super::event_utils::{report_task_result, EventSink};
use super::examples_downloader::ExamplesDownloader;
use super::python_env::PythonEnv;
use super::types::{NoticeLevel, TaskId, TaskKind};
use crate::config::{ConfigKey, ConfigRepository, ExamplesSource, MirrorSource, SetupConfig};
use crate::error::SetupError;

/// Maps user actions onto config updates and background tasks.
///
/// The controller never owns the configuration: the interactive loop does,
/// and hands it in by reference. Long-running work is spawned as detached
/// tokio tasks; their output only ever reaches the user through the
/// [`EventSink`]. There is no locking, so overlapping actions run side by side.
pub struct SetupController {
    repository: Box<dyn ConfigRepository>,
    sink: EventSink,
    env: Arc<PythonEnv>,
    downloader: Arc<ExamplesDownloader>,
}

impl SetupController {
    pub fn new(
        repository: Box<dyn ConfigRepository>,
        sink: EventSink,
        env: PythonEnv,
        downloader: ExamplesDownloader,
    ) -> Self {
        Self {
            repository,
            sink,
            env: Arc::new(env),
            downloader: Arc::new(downloader),
        }
    }

    pub fn sink(&self) -> &EventSink {
        &self.sink
    }

    fn refuse(&self, err: SetupError) -> SetupError {
        warn!("[SETUP_ORCHESTRATION] Refused: {}", err);
        self.sink.notice(NoticeLevel::Warning, "Warning", err.to_string());
        err
    }

    fn persist(&self, config: &mut SetupConfig, key: ConfigKey, value: &str) -> Result<(), SetupError> {
        self.repository.set_and_save(config, key, value).map_err(|e| {
            self.sink.notice(NoticeLevel::Error, "Error", e.to_string());
            e
        })
    }

    fn spawn_task<F, Fut>(&self, kind: TaskKind, work: F) -> JoinHandle<()>
    where
        F: FnOnce(TaskId, EventSink) -> Fut,
        Fut: Future<Output = Result<String, SetupError>> + Send + 'static,
    {
        let task = TaskId::new();
        let sink = self.sink.clone();
        info!("[SETUP_ORCHESTRATION] Starting {} task {}", kind.label(), task);
        let fut = work(task, sink.clone());
        tokio::spawn(async move {
            let result = fut.await;
            report_task_result(&sink, task, kind, &result);
        })
    }

    /// Persists the chosen directory and creates the venv there if it is
    /// missing. Returns the bootstrap task, if one was started.
    pub fn choose_working_directory(
        &self,
        config: &mut SetupConfig,
        path: &Path,
    ) -> Result<Option<JoinHandle<()>>, SetupError> {
        if !path.is_dir() {
            return Err(self.refuse(SetupError::Io(format!("'{}' is not an existing directory", path.display()))));
        }
        let value = path.to_string_lossy().into_owned();
        self.persist(config, ConfigKey::WorkingDirectory, &value)?;
        self.sink.log(None, format!("Working directory set to: {}", value));

        if self.env.venv_exists(path) {
            return Ok(None);
        }
        let env = Arc::clone(&self.env);
        let runner = env.runner(Some(path.to_path_buf()));
        Ok(Some(self.spawn_task(TaskKind::CreateVenv, move |task, sink| async move {
            env.ensure_venv(&runner, &sink, task).await?;
            Ok("Virtual environment is ready.".to_string())
        })))
    }

    pub fn select_mirror(&self, config: &mut SetupConfig, mirror: MirrorSource) -> Result<(), SetupError> {
        self.persist(config, ConfigKey::MirrorSource, mirror.label())?;
        self.sink.log(None, format!("Mirror source set to: {}", mirror));
        Ok(())
    }

    pub fn select_examples_source(&self, config: &mut SetupConfig, source: ExamplesSource) -> Result<(), SetupError> {
        self.persist(config, ConfigKey::ExamplesSource, source.label())?;
        self.sink.log(None, format!("Examples source set to: {}", source));
        Ok(())
    }

    pub fn install(&self, config: &SetupConfig) -> Result<JoinHandle<()>, SetupError> {
        let working_dir = config.working_dir().ok_or_else(|| self.refuse(SetupError::ConfigMissing))?;
        let mirror = config.mirror_source;
        let env = Arc::clone(&self.env);
        let runner = env.runner(Some(working_dir));
        Ok(self.spawn_task(TaskKind::Install, move |task, sink| async move {
            env.install_package(&runner, &sink, task, mirror).await?;
            Ok("Operation completed successfully.".to_string())
        }))
    }

    pub fn update(&self, config: &SetupConfig) -> Result<JoinHandle<()>, SetupError> {
        let working_dir = config.working_dir().ok_or_else(|| self.refuse(SetupError::ConfigMissing))?;
        if !self.env.venv_exists(&working_dir) {
            return Err(self.refuse(SetupError::EnvironmentMissing {
                venv_path: self.env.venv_path(&working_dir),
            }));
        }
        let mirror = config.mirror_source;
        let env = Arc::clone(&self.env);
        let runner = env.runner(Some(working_dir));
        Ok(self.spawn_task(TaskKind::Update, move |task, sink| async move {
            env.update_package(&runner, &sink, task, mirror).await?;
            Ok("Operation completed successfully.".to_string())
        }))
    }

    pub fn download_examples(&self, config: &SetupConfig) -> Result<JoinHandle<()>, SetupError> {
        let source = config.examples_source;
        self.download_examples_from(config, source.label(), source.url())
    }

    /// Download from an explicit URL; `label` is only used in messages.
    pub fn download_examples_from(
        &self,
        config: &SetupConfig,
        label: &str,
        url: &str,
    ) -> Result<JoinHandle<()>, SetupError> {
        let working_dir = config.working_dir().ok_or_else(|| self.refuse(SetupError::ConfigMissing))?;
        let downloader = Arc::clone(&self.downloader);
        let label = label.to_string();
        let url = url.to_string();
        Ok(self.spawn_task(TaskKind::DownloadExamples, move |task, sink| async move {
            sink.log(Some(task), format!("Downloading examples from {}...", label));
            let files = downloader
                .download_and_extract(&sink, task, &url, Some(working_dir.as_path()))
                .await?;
            info!("[TASK {}] {} files extracted", task, files);
            sink.log(Some(task), "Examples downloaded and extracted.");
            Ok("Examples downloaded and extracted.".to_string())
        }))
    }

    pub fn clear_output(&self) {
        self.sink.clear();
    }

    /// Writes the current configuration and venv state to the log view.
    pub fn show_status(&self, config: &SetupConfig) {
        match config.working_dir() {
            Some(dir) => {
                let venv = self.env.venv_path(&dir);
                let state = if venv.exists() { "present" } else { "missing" };
                self.sink.log(None, format!("Working directory: {}", dir.display()));
                self.sink.log(None, format!("Virtual environment: {} ({})", venv.display(), state));
            }
            None => self.sink.log(None, "Working directory: (not set)"),
        }
        self.sink.log(None, format!("Mirror source: {}", config.mirror_source));
        self.sink.log(None, format!("Examples source: {}", config.examples_source));
    }
}
