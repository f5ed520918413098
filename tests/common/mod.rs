#![allow(dead_code)]

use std::io::{Cursor, Write};

use quicksetup_lib::setup_manager::SetupEvent;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Serves exactly one HTTP response on 127.0.0.1 and returns the URL to hit.
pub async fn serve_once(status_line: &'static str, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        let header = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/zip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status_line,
            body.len()
        );
        let _ = socket.write_all(header.as_bytes()).await;
        let _ = socket.write_all(&body).await;
        let _ = socket.shutdown().await;
    });
    format!("http://{}/archive/refs/heads/main.zip", addr)
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn drain(rx: &mut UnboundedReceiver<SetupEvent>) -> Vec<SetupEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

pub fn log_lines(events: &[SetupEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SetupEvent::Log { line, .. } => Some(line.clone()),
            _ => None,
        })
        .collect()
}
