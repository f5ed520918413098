// quicksetup/src/setup_manager/command_runner.rs
use std::fmt;
use std::path::{Path, PathBuf};

use log::{error, info};
use tokio::process::Command;

use super::event_utils::EventSink;
use super::types::TaskId;
use crate::error::SetupError;
use crate::process_manager::{spawn_streaming, CommandResult};

/// A program plus its arguments, kept apart so nothing is re-split by a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new<S: Into<String>>(program: impl Into<String>, args: impl IntoIterator<Item = S>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How a virtual environment gets activated on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFamily {
    /// `cmd /C call <venv>\Scripts\activate.bat && ...`
    Windows,
    /// `sh -c '. <venv>/bin/activate && exec "$@"' ...`
    Posix,
}

impl ShellFamily {
    pub fn host() -> Self {
        if cfg!(windows) {
            ShellFamily::Windows
        } else {
            ShellFamily::Posix
        }
    }

    pub fn activation_script(&self, venv_dir: &Path) -> PathBuf {
        match self {
            ShellFamily::Windows => venv_dir.join("Scripts").join("activate.bat"),
            ShellFamily::Posix => venv_dir.join("bin").join("activate"),
        }
    }
}

/// Fully resolved invocation: what actually gets spawned, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: PathBuf,
}

// The activation step is the only part that needs shell syntax. The real
// command still travels as separate arguments ("$@" on POSIX).
const POSIX_ACTIVATE_SCRIPT: &str = r#". "$1" && shift && exec "$@""#;

pub fn prepare_command(
    command: &CommandLine,
    working_dir: &Path,
    activate_venv: Option<&Path>,
    family: ShellFamily,
) -> PreparedCommand {
    let (program, args) = match activate_venv {
        None => (command.program.clone(), command.args.clone()),
        Some(venv_dir) => {
            let script = family.activation_script(venv_dir).to_string_lossy().into_owned();
            match family {
                ShellFamily::Windows => {
                    let mut args = vec!["/C".to_string(), "call".to_string(), script, "&&".to_string()];
                    args.push(command.program.clone());
                    args.extend(command.args.iter().cloned());
                    ("cmd".to_string(), args)
                }
                ShellFamily::Posix => {
                    let mut args = vec!["-c".to_string(), POSIX_ACTIVATE_SCRIPT.to_string(), "sh".to_string(), script];
                    args.push(command.program.clone());
                    args.extend(command.args.iter().cloned());
                    ("sh".to_string(), args)
                }
            }
        }
    };
    PreparedCommand {
        program,
        args,
        current_dir: working_dir.to_path_buf(),
    }
}

/// Runs commands inside the configured working directory, optionally with
/// the venv activated, streaming every output line to the event sink.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    working_dir: Option<PathBuf>,
    venv_name: String,
    family: ShellFamily,
}

impl CommandRunner {
    pub fn new(working_dir: Option<PathBuf>, venv_name: impl Into<String>) -> Self {
        Self {
            working_dir,
            venv_name: venv_name.into(),
            family: ShellFamily::host(),
        }
    }

    pub fn with_shell_family(mut self, family: ShellFamily) -> Self {
        self.family = family;
        self
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Resolves the invocation without running it. Fails only when no
    /// working directory is configured.
    pub fn prepare(&self, command: &CommandLine, use_venv: bool) -> Result<PreparedCommand, SetupError> {
        let working_dir = self.working_dir.as_deref().ok_or(SetupError::ConfigMissing)?;
        let venv_dir = use_venv.then(|| working_dir.join(&self.venv_name));
        Ok(prepare_command(command, working_dir, venv_dir.as_deref(), self.family))
    }

    /// Spawns the command, forwards its output line by line and classifies
    /// the exit: code 0 is `Ok`, anything else is [`SetupError::CommandFailed`].
    pub async fn run(
        &self,
        sink: &EventSink,
        task: TaskId,
        command: &CommandLine,
        use_venv: bool,
    ) -> Result<CommandResult, SetupError> {
        let prepared = self.prepare(command, use_venv)?;
        info!(
            "[TASK {}] Executing: {} {:?} (cwd: {})",
            task,
            prepared.program,
            prepared.args,
            prepared.current_dir.display()
        );

        let mut cmd = Command::new(&prepared.program);
        cmd.args(&prepared.args).current_dir(&prepared.current_dir);

        let mut process = spawn_streaming(cmd, &format!("{}_{}", command.program, task))?;
        while let Some(line) = process.next_line().await {
            sink.log(Some(task), line);
        }
        let result = process.wait().await?;

        if result.success() {
            Ok(result)
        } else {
            error!("[TASK {}] '{}' failed: {:?}", task, command, result);
            Err(SetupError::CommandFailed { code: result.exit_code })
        }
    }
}
