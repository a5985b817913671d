//! Polling file-drop transport.
//!
//! The client drops `request.txt` into the shared directory and polls for
//! `response.txt`; the service polls for `request.txt`, removes it, and drops
//! `response.txt`. Each file appears atomically (written to a `.tmp` sibling
//! and renamed). A file's existence is the signal, and whoever reads a file
//! deletes it.

use super::{Channel, Endpoint, TransportError};
use crate::core::constants::{
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_REPLY_TIMEOUT_SECONDS, REQUEST_FILE, RESPONSE_FILE,
};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FileDropConfig {
    pub dir: PathBuf,
    pub poll_interval: Duration,
    pub reply_timeout: Duration,
}

impl FileDropConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            reply_timeout: Duration::from_secs(DEFAULT_REPLY_TIMEOUT_SECONDS),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn request_path(&self) -> PathBuf {
        self.dir.join(REQUEST_FILE)
    }

    pub fn response_path(&self) -> PathBuf {
        self.dir.join(RESPONSE_FILE)
    }
}

/// Service side.
#[derive(Debug)]
pub struct FileDropEndpoint {
    config: FileDropConfig,
}

impl FileDropEndpoint {
    pub async fn new(config: FileDropConfig) -> io::Result<Self> {
        fs::create_dir_all(&config.dir).await?;
        Ok(Self { config })
    }
}

impl Endpoint for FileDropEndpoint {
    /// Never returns `None`: there is no connection to lose.
    async fn next_request(&mut self) -> Result<Option<String>, TransportError> {
        let raw = take_when_present(&self.config.request_path(), self.config.poll_interval).await?;
        Ok(Some(raw))
    }

    async fn reply(&mut self, payload: &str) -> Result<(), TransportError> {
        drop_file(&self.config.response_path(), payload).await?;
        Ok(())
    }
}

/// Client side.
#[derive(Debug)]
pub struct FileDropChannel {
    config: FileDropConfig,
}

impl FileDropChannel {
    pub fn new(config: FileDropConfig) -> Self {
        Self { config }
    }
}

impl Channel for FileDropChannel {
    async fn send(&mut self, payload: &str) -> Result<(), TransportError> {
        // A reply left by an abandoned exchange would be read as ours.
        remove_if_present(&self.config.response_path()).await?;
        drop_file(&self.config.request_path(), payload).await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<String, TransportError> {
        let path = self.config.response_path();
        let wait = take_when_present(&path, self.config.poll_interval);
        match tokio::time::timeout(self.config.reply_timeout, wait).await {
            Ok(reply) => Ok(reply?),
            Err(_) => Err(TransportError::Timeout(self.config.reply_timeout)),
        }
    }
}

/// Polls until `path` exists, then reads and deletes it.
///
/// There is no await point between a completed read and the removal, so a
/// caller that drops this future either leaves the file in place or gets its
/// contents back.
async fn take_when_present(path: &Path, poll_interval: Duration) -> io::Result<String> {
    loop {
        match fs::read_to_string(path).await {
            Ok(contents) => {
                std::fs::remove_file(path)?;
                debug!(path = %path.display(), "picked up file");
                return Ok(contents.trim_end_matches(['\r', '\n']).to_string());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tokio::time::sleep(poll_interval).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn drop_file(path: &Path, contents: &str) -> io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await
}

async fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> FileDropConfig {
        FileDropConfig::new(dir.path())
            .with_poll_interval(Duration::from_millis(5))
            .with_reply_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_request_is_consumed_by_endpoint() {
        let dir = TempDir::new().unwrap();
        let mut client = FileDropChannel::new(config(&dir));
        let mut endpoint = FileDropEndpoint::new(config(&dir)).await.unwrap();

        client.send("level_up").await.unwrap();
        let raw = endpoint.next_request().await.unwrap();
        assert_eq!(raw.as_deref(), Some("level_up"));
        assert!(!config(&dir).request_path().exists());
    }

    #[tokio::test]
    async fn test_reply_is_deleted_after_reading() {
        let dir = TempDir::new().unwrap();
        let mut client = FileDropChannel::new(config(&dir));
        let mut endpoint = FileDropEndpoint::new(config(&dir)).await.unwrap();

        endpoint.reply("{\"status\":\"success\"}").await.unwrap();
        assert_eq!(client.receive().await.unwrap(), "{\"status\":\"success\"}");
        assert!(!config(&dir).response_path().exists());
    }

    #[tokio::test]
    async fn test_send_discards_stale_reply() {
        let dir = TempDir::new().unwrap();
        std::fs::write(config(&dir).response_path(), "stale").unwrap();

        let mut client = FileDropChannel::new(config(&dir));
        client.send("get_active_character").await.unwrap();
        assert!(!config(&dir).response_path().exists());
        assert!(config(&dir).request_path().exists());
    }

    #[tokio::test]
    async fn test_cancelled_wait_leaves_request_in_place() {
        let dir = TempDir::new().unwrap();
        let mut endpoint = FileDropEndpoint::new(config(&dir)).await.unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(20), endpoint.next_request()).await;
        assert!(waited.is_err());

        let mut client = FileDropChannel::new(config(&dir));
        client.send("level_up").await.unwrap();
        let raw = endpoint.next_request().await.unwrap();
        assert_eq!(raw.as_deref(), Some("level_up"));
        assert!(!config(&dir).request_path().exists());
    }

    #[tokio::test]
    async fn test_receive_times_out() {
        let dir = TempDir::new().unwrap();
        let mut client = FileDropChannel::new(config(&dir));
        assert!(matches!(
            client.receive().await,
            Err(TransportError::Timeout(_))
        ));
    }
}
