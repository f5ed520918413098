// quicksetup/src/process_manager.rs
use std::io::{BufRead, BufReader, Read};
use std::process::{ExitStatus, Stdio};

use log::{debug, error, info};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::error::SetupError;

/// Lines buffered between the pipe reader and the consumer.
const LINE_BUFFER: usize = 256;

/// Final result of a managed command execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && self.signal.is_none()
    }

    fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            exit_code: status.code(),
            signal,
        }
    }
}

/// A spawned child whose stdout and stderr are read line by line.
///
/// Both streams share one pipe, so lines come out of
/// [`next_line`](Self::next_line) once, in the order the child wrote them; after the last one, [`wait`](Self::wait) yields the
/// exit status. Dropping this does not kill the child.
pub struct RunningProcess {
    name: String,
    child: Child,
    lines: mpsc::Receiver<String>,
}

impl RunningProcess {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next output line, or `None` once the pipe is closed.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Drains anything left unread and waits for the child to exit.
    pub async fn wait(mut self) -> Result<CommandResult, SetupError> {
        while let Some(line) = self.lines.recv().await {
            debug!("[{}] (unread) {}", self.name, line);
        }
        let status = self.child.wait().await.map_err(|e| {
            error!("Failed to wait for process '{}': {}", self.name, e);
            SetupError::Io(format!("Failed to wait for '{}': {}", self.name, e))
        })?;
        let result = CommandResult::from_status(status);
        info!(
            "Process '{}' terminated with code: {:?}, signal: {:?}",
            self.name, result.exit_code, result.signal
        );
        Ok(result)
    }
}

/// Spawns `command` with stdout and stderr writing into the same pipe.
pub fn spawn_streaming(mut command: Command, name: &str) -> Result<RunningProcess, SetupError> {
    let (reader, writer) = os_pipe::pipe()
        .map_err(|e| SetupError::Spawn(format!("Failed to create output pipe for '{}': {}", name, e)))?;
    let stderr_writer = writer
        .try_clone()
        .map_err(|e| SetupError::Spawn(format!("Failed to create output pipe for '{}': {}", name, e)))?;
    command.stdin(Stdio::null()).stdout(writer).stderr(stderr_writer);

    info!("Spawning managed process: {}", name);
    let spawned = command.spawn();
    // The command still holds the write ends; the reader only sees EOF once
    // they are gone.
    drop(command);
    let child = spawned.map_err(|e| {
        let err_msg = format!("Failed to spawn process '{}': {}", name, e);
        error!("{}", err_msg);
        SetupError::Spawn(err_msg)
    })?;

    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    forward_lines(reader, tx, format!("{}_output", name));

    Ok(RunningProcess {
        name: name.to_string(),
        child,
        lines: rx,
    })
}

// The pipe is a plain blocking handle, so it is read on the blocking pool.
// Output is decoded lossily: pip on Windows prints in the console code page.
fn forward_lines<R>(pipe: R, tx: mpsc::Sender<String>, tag: String)
where
    R: Read + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).trim_end_matches(['\r', '\n']).to_string();
                    debug!("[{}] {}", tag, line);
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("[{}] read error: {}", tag, e);
                    break;
                }
            }
        }
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn streams_lines_in_order_then_exit_code() {
        let mut process = spawn_streaming(sh("echo one; echo two; echo three"), "three_lines").unwrap();
        let mut lines = Vec::new();
        while let Some(line) = process.next_line().await {
            lines.push(line);
        }
        assert_eq!(lines, vec!["one", "two", "three"]);

        let result = process.wait().await.unwrap();
        assert_eq!(result.exit_code, Some(0));
        assert!(result.success());
    }

    #[tokio::test]
    async fn stderr_is_merged_into_the_stream() {
        let mut process = spawn_streaming(sh("echo oops >&2; exit 3"), "stderr").unwrap();
        let mut lines = Vec::new();
        while let Some(line) = process.next_line().await {
            lines.push(line);
        }
        assert_eq!(lines, vec!["oops"]);

        let result = process.wait().await.unwrap();
        assert_eq!(result.exit_code, Some(3));
        assert!(!result.success());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn interleaved_stdout_and_stderr_keep_their_order() {
        for _ in 0..50 {
            let mut process = spawn_streaming(
                sh("echo 1; echo 2 >&2; echo 3; echo 4 >&2; echo 5"),
                "interleaved",
            )
            .unwrap();
            let mut lines = Vec::new();
            while let Some(line) = process.next_line().await {
                lines.push(line);
            }
            assert_eq!(lines, vec!["1", "2", "3", "4", "5"]);
            assert!(process.wait().await.unwrap().success());
        }
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let cmd = Command::new("definitely-not-a-real-program-quicksetup");
        match spawn_streaming(cmd, "missing") {
            Err(SetupError::Spawn(msg)) => assert!(msg.contains("missing")),
            other => panic!("expected spawn error, got {:?}", other.map(|p| p.name().to_string())),
        }
    }

    #[tokio::test]
    async fn wait_without_reading_still_reports_status() {
        let process = spawn_streaming(sh("echo ignored; exit 0"), "unread").unwrap();
        assert!(process.wait().await.unwrap().success());
    }
}
