// quicksetup/src/console.rs
//
// The interactive surface. This loop is the only owner of the configuration
// and the only code that writes to stdout; background tasks reach it through
// the event channel.
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;

use chrono::Local;
use log::{error, info};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::config::{ExamplesSource, MirrorSource, SetupConfig};
use crate::error::SetupError;
use crate::setup_manager::orchestration::SetupController;
use crate::setup_manager::types::{NoticeLevel, SetupEvent};

const HELP: &str = "\
Commands:
  dir <path>                          choose the working directory (creates the venv if missing)
  mirror <default|aliyun|tsinghua>    choose the pip mirror
  source <github|moeyy>               choose where the examples are downloaded from
  install                             install autowsgr into the venv
  update                              upgrade autowsgr in the venv
  download                            download and extract the examples
  status                              show the current settings
  clear                               clear the output
  help                                show this text
  quit                                exit (running tasks are abandoned)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    ChooseDirectory(PathBuf),
    SelectMirror(MirrorSource),
    SelectSource(ExamplesSource),
    Install,
    Update,
    Download,
    Status,
    Clear,
    Help,
    Quit,
    Nothing,
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, SetupError> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let command = match verb.to_lowercase().as_str() {
        "" => ConsoleCommand::Nothing,
        "dir" | "cd" => {
            if rest.is_empty() {
                return Err(SetupError::Config("Usage: dir <path>".to_string()));
            }
            ConsoleCommand::ChooseDirectory(PathBuf::from(rest.trim_matches('"')))
        }
        "mirror" => ConsoleCommand::SelectMirror(
            MirrorSource::parse(rest).ok_or_else(|| SetupError::Config(format!("Unknown mirror: '{}'", rest)))?,
        ),
        "source" => ConsoleCommand::SelectSource(
            ExamplesSource::parse(rest).ok_or_else(|| SetupError::InvalidSource(rest.to_string()))?,
        ),
        "install" => ConsoleCommand::Install,
        "update" => ConsoleCommand::Update,
        "download" => ConsoleCommand::Download,
        "status" => ConsoleCommand::Status,
        "clear" => ConsoleCommand::Clear,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(SetupError::Config(format!("Unknown command '{}'. Type 'help'.", other))),
    };
    Ok(command)
}

/// Text shown for an event, or `None` when it only affects the screen.
pub fn render_event(event: &SetupEvent) -> Option<String> {
    let stamp = Local::now().format("%H:%M:%S");
    match event {
        SetupEvent::Log { task: Some(task), line } => Some(format!("[{}] [{}] {}", stamp, task, line)),
        SetupEvent::Log { task: None, line } => Some(format!("[{}] {}", stamp, line)),
        SetupEvent::Notice { level, title, message } => {
            let tag = match level {
                NoticeLevel::Info => "INFO",
                NoticeLevel::Warning => "WARNING",
                NoticeLevel::Error => "ERROR",
            };
            Some(format!("*** [{}] {}: {} ***", tag, title, message))
        }
        SetupEvent::TaskFinished { task, kind, success } => Some(format!(
            "[{}] [{}] {} {}",
            stamp,
            task,
            kind.label(),
            if *success { "finished" } else { "failed" }
        )),
        SetupEvent::ClearLog => None,
    }
}

fn dispatch(controller: &SetupController, config: &mut SetupConfig, command: ConsoleCommand) {
    // Refusals and persistence errors are already on the event channel.
    let outcome = match command {
        ConsoleCommand::ChooseDirectory(path) => controller.choose_working_directory(config, &path).map(|_| ()),
        ConsoleCommand::SelectMirror(mirror) => controller.select_mirror(config, mirror),
        ConsoleCommand::SelectSource(source) => controller.select_examples_source(config, source),
        ConsoleCommand::Install => controller.install(config).map(|_| ()),
        ConsoleCommand::Update => controller.update(config).map(|_| ()),
        ConsoleCommand::Download => controller.download_examples(config).map(|_| ()),
        ConsoleCommand::Status => {
            controller.show_status(config);
            Ok(())
        }
        ConsoleCommand::Clear => {
            controller.clear_output();
            Ok(())
        }
        ConsoleCommand::Help => {
            for line in HELP.lines() {
                controller.sink().log(None, line);
            }
            Ok(())
        }
        ConsoleCommand::Quit | ConsoleCommand::Nothing => Ok(()),
    };
    if let Err(e) = outcome {
        info!("[CONSOLE] Action not started: {}", e);
    }
}

// Reading stdin blocks, so it gets its own thread instead of a runtime worker.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("[CONSOLE] Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// Runs until `quit` or end of input.
pub async fn run_console(controller: SetupController, mut config: SetupConfig, mut events: UnboundedReceiver<SetupEvent>) {
    let mut input = spawn_stdin_reader();

    println!("AutoWSGR quick setup");
    controller.show_status(&config);
    controller.sink().log(None, "Type 'help' for the list of commands.");

    loop {
        tokio::select! {
            line = input.recv() => {
                let Some(line) = line else {
                    info!("[CONSOLE] End of input");
                    break;
                };
                match parse_command(&line) {
                    Ok(ConsoleCommand::Quit) => break,
                    Ok(command) => dispatch(&controller, &mut config, command),
                    Err(e) => println!("{}", e),
                }
            }
            Some(event) = events.recv() => {
                match render_event(&event) {
                    Some(text) => println!("{}", text),
                    None => {
                        print!("\x1b[2J\x1b[H");
                        let _ = io::stdout().flush();
                    }
                }
            }
        }
    }
    info!("[CONSOLE] Leaving interactive loop");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup_manager::types::{TaskId, TaskKind};

    #[test]
    fn parses_every_action() {
        assert_eq!(parse_command("install").unwrap(), ConsoleCommand::Install);
        assert_eq!(parse_command("  UPDATE ").unwrap(), ConsoleCommand::Update);
        assert_eq!(parse_command("download").unwrap(), ConsoleCommand::Download);
        assert_eq!(parse_command("status").unwrap(), ConsoleCommand::Status);
        assert_eq!(parse_command("clear").unwrap(), ConsoleCommand::Clear);
        assert_eq!(parse_command("quit").unwrap(), ConsoleCommand::Quit);
        assert_eq!(parse_command("").unwrap(), ConsoleCommand::Nothing);
        assert_eq!(
            parse_command("mirror tsinghua").unwrap(),
            ConsoleCommand::SelectMirror(MirrorSource::Tsinghua)
        );
        assert_eq!(
            parse_command("source moeyy").unwrap(),
            ConsoleCommand::SelectSource(ExamplesSource::Moeyy)
        );
    }

    #[test]
    fn directory_keeps_spaces_and_strips_quotes() {
        assert_eq!(
            parse_command(r#"dir "/home/me/my games""#).unwrap(),
            ConsoleCommand::ChooseDirectory(PathBuf::from("/home/me/my games"))
        );
        assert!(matches!(parse_command("dir"), Err(SetupError::Config(_))));
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(matches!(parse_command("source gitee"), Err(SetupError::InvalidSource(_))));
        assert!(parse_command("mirror douban").is_err());
        assert!(parse_command("frobnicate").is_err());
    }

    #[test]
    fn renders_events() {
        let task = TaskId::new();
        let line = render_event(&SetupEvent::Log { task: Some(task), line: "Collecting autowsgr".into() }).unwrap();
        assert!(line.ends_with(&format!("[{}] Collecting autowsgr", task)));

        let notice = render_event(&SetupEvent::Notice {
            level: NoticeLevel::Error,
            title: "Error".into(),
            message: "boom".into(),
        })
        .unwrap();
        assert_eq!(notice, "*** [ERROR] Error: boom ***");

        let done = render_event(&SetupEvent::TaskFinished { task, kind: TaskKind::Install, success: true }).unwrap();
        assert!(done.ends_with("install finished"));

        assert!(render_event(&SetupEvent::ClearLog).is_none());
    }
}
