//! Platform download boundary.
//!
//! A [`DownloadSink`] is whatever turns "save these bytes as `name`" into a
//! user-visible file. Triggering a save hands the work to the sink and returns
//! at once, like a browser download: the sink owns the transfer and reports its
//! own failures. Callers never see a result.
//!
//! [`DirectorySink`] is the CLI's sink: it writes into an output directory on
//! background tasks and keeps a report of what happened, which
//! [`DirectorySink::wait_idle`] hands back once everything triggered so far
//! has settled. Existing files are never overwritten; a save of `a.png` next
//! to an existing one becomes `a (1).png`.

use crate::fetch::{FetchError, Fetcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("download task failed: {0}")]
    Task(String),
    #[error("no async runtime available to run the download")]
    NoRuntime,
}

pub trait DownloadSink: Send + Sync {
    /// Save bytes already in memory.
    fn trigger_bytes(&self, filename: &str, bytes: Vec<u8>);

    /// Save whatever `url` resolves to.
    fn trigger_url(&self, url: &str, filename: &str);
}

/// Outcome of one triggered save.
#[derive(Debug)]
pub struct DownloadReport {
    pub filename: String,
    pub result: Result<PathBuf, DownloadError>,
}

enum Pending {
    Running(JoinHandle<Result<PathBuf, DownloadError>>),
    Done(Result<PathBuf, DownloadError>),
}

/// Writes downloads into a directory.
pub struct DirectorySink {
    dir: PathBuf,
    fetcher: Arc<dyn Fetcher>,
    pending: Mutex<Vec<(String, Pending)>>,
    /// Serializes name selection so concurrent saves of one name do not collide.
    naming: Arc<tokio::sync::Mutex<()>>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            dir: dir.into(),
            fetcher,
            pending: Mutex::new(Vec::new()),
            naming: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn spawn<F>(&self, filename: &str, work: F)
    where
        F: std::future::Future<Output = Result<PathBuf, DownloadError>> + Send + 'static,
    {
        let pending = match tokio::runtime::Handle::try_current() {
            Ok(rt) => Pending::Running(rt.spawn(work)),
            Err(_) => {
                error!(%filename, "download triggered outside a runtime");
                Pending::Done(Err(DownloadError::NoRuntime))
            }
        };
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((filename.to_string(), pending));
    }

    /// Wait for every save triggered so far and return their reports.
    pub async fn wait_idle(&self) -> Vec<DownloadReport> {
        let pending = std::mem::take(
            &mut *self
                .pending
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        let mut reports = Vec::with_capacity(pending.len());
        for (filename, pending) in pending {
            let result = match pending {
                Pending::Running(handle) => match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(DownloadError::Task(e.to_string())),
                },
                Pending::Done(result) => result,
            };
            reports.push(DownloadReport { filename, result });
        }
        reports
    }
}

impl DownloadSink for DirectorySink {
    fn trigger_bytes(&self, filename: &str, bytes: Vec<u8>) {
        let dir = self.dir.clone();
        let name = filename.to_string();
        let naming = Arc::clone(&self.naming);
        self.spawn(filename, async move {
            let result = write_new_file(&dir, &name, &bytes, &naming).await;
            log_result(&name, &result);
            result
        });
    }

    fn trigger_url(&self, url: &str, filename: &str) {
        let dir = self.dir.clone();
        let name = filename.to_string();
        let url = url.to_string();
        let fetcher = Arc::clone(&self.fetcher);
        let naming = Arc::clone(&self.naming);
        self.spawn(filename, async move {
            let result = match fetcher.fetch(&url).await {
                Ok(bytes) => write_new_file(&dir, &name, &bytes, &naming).await,
                Err(e) => Err(DownloadError::Fetch(e)),
            };
            log_result(&name, &result);
            result
        });
    }
}

fn log_result(filename: &str, result: &Result<PathBuf, DownloadError>) {
    match result {
        Ok(path) => info!(%filename, path = %path.display(), "saved download"),
        Err(e) => error!(%filename, error = %e, "download failed"),
    }
}

/// `a.png`, `a (1).png`, `a (2).png`, ...
fn numbered_name(filename: &str, n: usize) -> String {
    if n == 0 {
        return filename.to_string();
    }
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({n}).{ext}"),
        _ => format!("{filename} ({n})"),
    }
}

async fn write_new_file(
    dir: &Path,
    filename: &str,
    bytes: &[u8],
    naming: &tokio::sync::Mutex<()>,
) -> Result<PathBuf, DownloadError> {
    tokio::fs::create_dir_all(dir).await?;
    let _naming = naming.lock().await;
    let mut n = 0;
    let path = loop {
        let candidate = dir.join(numbered_name(filename, n));
        if !tokio::fs::try_exists(&candidate).await? {
            break candidate;
        }
        n += 1;
    };
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockFetcher;
    use tempfile::TempDir;

    #[test]
    fn trigger_outside_runtime_is_reported() {
        let tmp = TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path(), Arc::new(MockFetcher::new()));
        sink.trigger_bytes("a.png", vec![1]);

        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let reports = rt.block_on(sink.wait_idle());
        assert!(matches!(reports[0].result, Err(DownloadError::NoRuntime)));
    }

    #[test]
    fn numbered_names() {
        assert_eq!(numbered_name("a.png", 0), "a.png");
        assert_eq!(numbered_name("a.png", 2), "a (2).png");
        assert_eq!(numbered_name("archive", 1), "archive (1)");
        assert_eq!(numbered_name(".hidden", 1), ".hidden (1)");
    }

    #[tokio::test]
    async fn bytes_are_written_without_clobbering() {
        let tmp = TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path(), Arc::new(MockFetcher::new()));

        sink.trigger_bytes("looks.zip", b"one".to_vec());
        sink.trigger_bytes("looks.zip", b"two".to_vec());
        let reports = sink.wait_idle().await;

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.result.is_ok()));
        let mut contents = vec![
            std::fs::read(tmp.path().join("looks.zip")).unwrap(),
            std::fs::read(tmp.path().join("looks (1).zip")).unwrap(),
        ];
        contents.sort();
        assert_eq!(contents, vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[tokio::test]
    async fn url_downloads_fetch_then_write() {
        let tmp = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        fetcher.serve("https://looks.test/a.png", b"png-bytes".to_vec());
        let sink = DirectorySink::new(tmp.path().join("out"), Arc::new(fetcher));

        sink.trigger_url("https://looks.test/a.png", "Soft-Waves.png");
        let reports = sink.wait_idle().await;

        let path = reports[0].result.as_ref().unwrap();
        assert_eq!(path, &tmp.path().join("out").join("Soft-Waves.png"));
        assert_eq!(std::fs::read(path).unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn failed_fetch_is_reported_by_the_sink() {
        let tmp = TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path(), Arc::new(MockFetcher::new()));

        sink.trigger_url("https://looks.test/missing.png", "Missing.png");
        let reports = sink.wait_idle().await;

        assert!(matches!(reports[0].result, Err(DownloadError::Fetch(_))));
        assert!(!tmp.path().join("Missing.png").exists());
        assert!(sink.wait_idle().await.is_empty());
    }
}
