// quicksetup/src/setup_manager/event_utils.rs
use log::{debug, error, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::types::{NoticeLevel, SetupEvent, TaskId, TaskKind};
use crate::error::SetupError;

/// Sending half of the log channel. Background tasks hold clones; the
/// interactive loop owns the single receiver.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: UnboundedSender<SetupEvent>,
}

pub fn event_channel() -> (EventSink, UnboundedReceiver<SetupEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, rx)
}

impl EventSink {
    pub fn emit(&self, event: SetupEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!("Event dropped, receiver is gone: {:?}", e.0);
        }
    }

    pub fn log(&self, task: Option<TaskId>, line: impl Into<String>) {
        self.emit(SetupEvent::Log { task, line: line.into() });
    }

    pub fn notice(&self, level: NoticeLevel, title: &str, message: impl Into<String>) {
        self.emit(SetupEvent::Notice {
            level,
            title: title.to_string(),
            message: message.into(),
        });
    }

    pub fn clear(&self) {
        self.emit(SetupEvent::ClearLog);
    }

    pub fn finished(&self, task: TaskId, kind: TaskKind, success: bool) {
        self.emit(SetupEvent::TaskFinished { task, kind, success });
    }
}

/// Turns the outcome of a task into the user-facing notice plus a log line,
/// then marks the task finished.
pub fn report_task_result(sink: &EventSink, task: TaskId, kind: TaskKind, result: &Result<String, SetupError>) {
    match result {
        Ok(message) => {
            info!("[TASK {}] {} succeeded", task, kind.label());
            sink.notice(NoticeLevel::Info, "Success", message.clone());
        }
        Err(e) if e.is_refusal() => {
            warn!("[TASK {}] {} refused: {}", task, kind.label(), e);
            sink.log(Some(task), e.to_string());
            sink.notice(NoticeLevel::Warning, "Warning", e.to_string());
        }
        Err(e) => {
            error!("[TASK {}] {} failed: {}", task, kind.label(), e);
            sink.log(Some(task), e.to_string());
            sink.notice(NoticeLevel::Error, "Error", e.to_string());
        }
    }
    sink.finished(task, kind, result.is_ok());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_send_order() {
        let (sink, mut rx) = event_channel();
        sink.log(None, "one");
        sink.log(None, "two");
        sink.clear();

        assert_eq!(rx.try_recv().unwrap(), SetupEvent::Log { task: None, line: "one".into() });
        assert_eq!(rx.try_recv().unwrap(), SetupEvent::Log { task: None, line: "two".into() });
        assert_eq!(rx.try_recv().unwrap(), SetupEvent::ClearLog);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn emit_after_receiver_dropped_is_harmless() {
        let (sink, rx) = event_channel();
        drop(rx);
        sink.log(None, "nobody listening");
    }

    #[test]
    fn refusal_is_reported_as_warning() {
        let (sink, mut rx) = event_channel();
        let task = TaskId::new();
        report_task_result(&sink, task, TaskKind::Update, &Err(SetupError::ConfigMissing));

        let mut saw_warning = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                SetupEvent::Notice { level, .. } => saw_warning = level == NoticeLevel::Warning,
                SetupEvent::TaskFinished { success, .. } => assert!(!success),
                _ => {}
            }
        }
        assert!(saw_warning);
    }

    #[test]
    fn failure_is_reported_as_error_with_cause() {
        let (sink, mut rx) = event_channel();
        let task = TaskId::new();
        report_task_result(&sink, task, TaskKind::Install, &Err(SetupError::CommandFailed { code: Some(1) }));

        let notices: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|e| match e {
                SetupEvent::Notice { level, message, .. } => Some((level, message)),
                _ => None,
            })
            .collect();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].0, NoticeLevel::Error);
        assert!(notices[0].1.contains("exit code: 1"));
    }
}
