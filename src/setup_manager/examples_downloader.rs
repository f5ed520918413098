// quicksetup/src/setup_manager/examples_downloader.rs
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use log::{debug, error, info};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::archive_utils::extract_zip;
use super::event_utils::EventSink;
use super::types::TaskId;
use crate::error::SetupError;

/// Name of the temporary archive inside the destination directory.
pub const ARCHIVE_FILE_NAME: &str = "examples.zip";
pub const DOWNLOAD_CHUNK_SIZE: usize = 8192;

pub struct ExamplesDownloader {
    client: reqwest::Client,
}

impl ExamplesDownloader {
    pub fn new() -> Result<Self, SetupError> {
        // No timeouts: a slow mirror is allowed to take as long as it needs.
        let client = reqwest::Client::builder()
            .user_agent(concat!("quicksetup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SetupError::Download(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Downloads the zip at `url` into `<destination>/examples.zip`, extracts it
    /// into `destination`, then deletes the archive.
    ///
    /// If extraction fails the archive is left where it is.
    pub async fn download_and_extract(
        &self,
        sink: &EventSink,
        task: TaskId,
        url: &str,
        destination: Option<&Path>,
    ) -> Result<usize, SetupError> {
        let destination = destination.ok_or(SetupError::ConfigMissing)?;
        let archive_path = archive_path(destination);

        let bytes = self.download_to_file(task, url, &archive_path).await?;
        info!("[TASK {}] Downloaded {} bytes to {}", task, bytes, archive_path.display());

        sink.log(Some(task), "Extracting archive...");
        let archive_for_blocking = archive_path.clone();
        let destination_for_blocking = destination.to_path_buf();
        let files = tokio::task::spawn_blocking(move || extract_zip(&archive_for_blocking, &destination_for_blocking))
            .await
            .map_err(|e| SetupError::Archive(format!("Extraction task panicked: {}", e)))??;

        tokio::fs::remove_file(&archive_path).await.map_err(|e| {
            SetupError::Io(format!("Failed to remove {}: {}", archive_path.display(), e))
        })?;
        debug!("[TASK {}] Removed {}", task, archive_path.display());
        Ok(files)
    }

    async fn download_to_file(&self, task: TaskId, url: &str, target: &Path) -> Result<u64, SetupError> {
        info!("[TASK {}] Starting download from {}", task, url);
        let response = self.client.get(url).send().await.map_err(|e| {
            let err_msg = format!("Failed to send request to {}: {}", url, e);
            error!("[TASK {}] {}", task, err_msg);
            SetupError::Download(err_msg)
        })?;

        if !response.status().is_success() {
            let err_msg = format!("HTTP status {} for {}", response.status(), url);
            error!("[TASK {}] {}", task, err_msg);
            return Err(SetupError::Download(err_msg));
        }

        let total_size = response.content_length();
        debug!("[TASK {}] Content length: {:?}", task, total_size);

        let file = File::create(target)
            .await
            .map_err(|e| SetupError::Io(format!("Failed to create {}: {}", target.display(), e)))?;
        let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, file);
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(item) = stream.next().await {
            let chunk = match item {
                Ok(chunk) => chunk,
                Err(e) => {
                    let err_msg = format!("Error while downloading chunk: {}. Downloaded so far: {} bytes.", e, downloaded);
                    error!("[TASK {}] {}", task, err_msg);
                    drop(writer);
                    remove_partial(target).await;
                    return Err(SetupError::Download(err_msg));
                }
            };
            if chunk.is_empty() {
                continue;
            }
            if let Err(e) = writer.write_all(&chunk).await {
                drop(writer);
                remove_partial(target).await;
                return Err(SetupError::Io(format!("Failed to write {}: {}", target.display(), e)));
            }
            downloaded += chunk.len() as u64;
        }

        writer
            .flush()
            .await
            .map_err(|e| SetupError::Io(format!("Failed to flush {}: {}", target.display(), e)))?;
        writer
            .into_inner()
            .sync_all()
            .await
            .map_err(|e| SetupError::Io(format!("Failed to sync {}: {}", target.display(), e)))?;
        Ok(downloaded)
    }
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!("Could not remove partial download {}: {}", path.display(), e);
    }
}

/// Where the archive lands before extraction.
pub fn archive_path(destination: &Path) -> PathBuf {
    destination.join(ARCHIVE_FILE_NAME)
}
