// quicksetup/src/setup_manager/python_env.rs
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::command_runner::{CommandLine, CommandRunner};
use super::event_utils::EventSink;
use super::types::TaskId;
use crate::config::MirrorSource;
use crate::error::SetupError;

pub const PACKAGE_NAME: &str = "autowsgr";
pub const VENV_NAME: &str = "autowsgr_venv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipAction {
    Install,
    Update,
}

/// Extra pip flags for the selected mirror. Updates through a non-default
/// mirror also get a trailing `--upgrade`.
pub fn mirror_options(mirror: MirrorSource, action: PipAction) -> Vec<String> {
    let mut options = Vec::new();
    if let Some((index_url, trusted_host)) = mirror.index() {
        options.extend([
            "-i".to_string(),
            index_url.to_string(),
            "--trusted-host".to_string(),
            trusted_host.to_string(),
        ]);
    }
    if action == PipAction::Update && mirror != MirrorSource::Default {
        options.push("--upgrade".to_string());
    }
    options
}

/// Names of the programs and directories involved in managing the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonEnv {
    pub python: String,
    pub pip: String,
    pub package_name: String,
    pub venv_name: String,
}

impl Default for PythonEnv {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            pip: "pip".to_string(),
            package_name: PACKAGE_NAME.to_string(),
            venv_name: VENV_NAME.to_string(),
        }
    }
}

impl PythonEnv {
    pub fn venv_path(&self, working_dir: &Path) -> PathBuf {
        working_dir.join(&self.venv_name)
    }

    pub fn venv_exists(&self, working_dir: &Path) -> bool {
        self.venv_path(working_dir).exists()
    }

    pub fn runner(&self, working_dir: Option<PathBuf>) -> CommandRunner {
        CommandRunner::new(working_dir, self.venv_name.clone())
    }

    /// `python -m venv <venv_name>`, run inside the working directory.
    pub fn create_venv_command(&self) -> CommandLine {
        CommandLine::new(self.python.clone(), ["-m".to_string(), "venv".to_string(), self.venv_name.clone()])
    }

    /// `pip install <package> [mirror flags]`
    pub fn install_command(&self, mirror: MirrorSource) -> CommandLine {
        let mut args = vec!["install".to_string(), self.package_name.clone()];
        args.extend(mirror_options(mirror, PipAction::Install));
        CommandLine::new(self.pip.clone(), args)
    }

    /// `pip install --upgrade <package> [mirror flags] [--upgrade]`
    pub fn update_command(&self, mirror: MirrorSource) -> CommandLine {
        let mut args = vec!["install".to_string(), "--upgrade".to_string(), self.package_name.clone()];
        args.extend(mirror_options(mirror, PipAction::Update));
        CommandLine::new(self.pip.clone(), args)
    }

    /// Creates the venv unless its directory already exists. Returns whether
    /// a creation command was run.
    ///
    /// Check-then-create is not atomic: two bootstraps started together can
    /// both decide to create the environment.
    pub async fn ensure_venv(
        &self,
        runner: &CommandRunner,
        sink: &EventSink,
        task: TaskId,
    ) -> Result<bool, SetupError> {
        let working_dir = runner.working_dir().ok_or(SetupError::ConfigMissing)?;
        let venv_path = self.venv_path(working_dir);
        if venv_path.exists() {
            info!("[TASK {}] Virtual environment found at {}. Skipping creation.", task, venv_path.display());
            return Ok(false);
        }

        info!("[TASK {}] Virtual environment not found at {}. Creating...", task, venv_path.display());
        sink.log(Some(task), format!("Creating virtual environment '{}'...", venv_path.display()));
        runner.run(sink, task, &self.create_venv_command(), false).await?;
        Ok(true)
    }

    /// Bootstraps the venv if needed, then installs the package inside it.
    pub async fn install_package(
        &self,
        runner: &CommandRunner,
        sink: &EventSink,
        task: TaskId,
        mirror: MirrorSource,
    ) -> Result<(), SetupError> {
        self.ensure_venv(runner, sink, task).await?;
        let command = self.install_command(mirror);
        sink.log(Some(task), format!("> {}", command));
        runner.run(sink, task, &command, true).await?;
        Ok(())
    }

    /// Upgrades the package. Refuses when the venv was never created.
    pub async fn update_package(
        &self,
        runner: &CommandRunner,
        sink: &EventSink,
        task: TaskId,
        mirror: MirrorSource,
    ) -> Result<(), SetupError> {
        let working_dir = runner.working_dir().ok_or(SetupError::ConfigMissing)?;
        let venv_path = self.venv_path(working_dir);
        if !venv_path.exists() {
            warn!("[TASK {}] Update requested but {} does not exist", task, venv_path.display());
            return Err(SetupError::EnvironmentMissing { venv_path });
        }
        let command = self.update_command(mirror);
        sink.log(Some(task), format!("> {}", command));
        runner.run(sink, task, &command, true).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup_manager::event_utils::event_channel;

    #[test]
    fn default_mirror_adds_no_flags() {
        assert!(mirror_options(MirrorSource::Default, PipAction::Install).is_empty());
        assert!(mirror_options(MirrorSource::Default, PipAction::Update).is_empty());
    }

    #[test]
    fn aliyun_flags() {
        let expected = ["-i", "https://mirrors.aliyun.com/pypi/simple", "--trusted-host", "mirrors.aliyun.com"];
        assert_eq!(mirror_options(MirrorSource::Aliyun, PipAction::Install), expected);
        let mut with_upgrade = expected.to_vec();
        with_upgrade.push("--upgrade");
        assert_eq!(mirror_options(MirrorSource::Aliyun, PipAction::Update), with_upgrade);
    }

    #[test]
    fn tsinghua_flags() {
        let expected = [
            "-i",
            "https://pypi.tuna.tsinghua.edu.cn/simple",
            "--trusted-host",
            "pypi.tuna.tsinghua.edu.cn",
        ];
        assert_eq!(mirror_options(MirrorSource::Tsinghua, PipAction::Install), expected);
        let update = mirror_options(MirrorSource::Tsinghua, PipAction::Update);
        assert_eq!(&update[..4], &expected);
        assert_eq!(update.last().map(String::as_str), Some("--upgrade"));
    }

    #[test]
    fn command_shapes() {
        let env = PythonEnv::default();
        assert_eq!(env.create_venv_command().to_string(), "python -m venv autowsgr_venv");
        assert_eq!(env.install_command(MirrorSource::Default).to_string(), "pip install autowsgr");
        assert_eq!(env.update_command(MirrorSource::Default).to_string(), "pip install --upgrade autowsgr");
        assert_eq!(
            env.update_command(MirrorSource::Aliyun).to_string(),
            "pip install --upgrade autowsgr -i https://mirrors.aliyun.com/pypi/simple --trusted-host mirrors.aliyun.com --upgrade"
        );
    }

    #[tokio::test]
    async fn update_without_venv_is_refused() {
        let dir = tempfile::TempDir::new().unwrap();
        let env = PythonEnv {
            pip: "definitely-not-pip".to_string(),
            ..PythonEnv::default()
        };
        let runner = env.runner(Some(dir.path().to_path_buf()));
        let (sink, mut rx) = event_channel();

        let err = env
            .update_package(&runner, &sink, TaskId::new(), MirrorSource::Default)
            .await
            .unwrap_err();
        match err {
            SetupError::EnvironmentMissing { venv_path } => assert_eq!(venv_path, dir.path().join(VENV_NAME)),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(rx.try_recv().is_err(), "nothing should have been logged or run");
    }

    #[tokio::test]
    async fn existing_venv_is_not_recreated() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(VENV_NAME)).unwrap();
        let env = PythonEnv {
            python: "definitely-not-python".to_string(),
            ..PythonEnv::default()
        };
        let runner = env.runner(Some(dir.path().to_path_buf()));
        let (sink, _rx) = event_channel();

        let created = env.ensure_venv(&runner, &sink, TaskId::new()).await.unwrap();
        assert!(!created);
    }

    #[tokio::test]
    async fn ensure_venv_needs_working_directory() {
        let env = PythonEnv::default();
        let runner = env.runner(None);
        let (sink, _rx) = event_channel();
        assert!(matches!(
            env.ensure_venv(&runner, &sink, TaskId::new()).await,
            Err(SetupError::ConfigMissing)
        ));
    }
}
