//! Shared test helpers for creating BatchDownloader instances in tests.

use crate::config::Config;
use crate::downloader::BatchDownloader;
use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::types::{Status, Task, TaskId};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// In-memory fetcher that records every call
///
/// URLs listed as failing return a 404 error, everything else succeeds.
/// A hanging fetcher never returns, which models a download that outlives
/// the shutdown drain.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    calls: Mutex<Vec<String>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    hang: bool,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing(urls: &[&str]) -> Self {
        Self {
            failing: urls.iter().map(|u| u.to_string()).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub(crate) fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    /// URLs fetched so far, in call order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str, task_id: TaskId) -> Result<PathBuf, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            });
        }
        Ok(PathBuf::from(format!("task_{}_{}", task_id, url.len())))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Test config rooted in `dir`
pub(crate) fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.download.download_dir = dir.join("files");
    config.persistence.state_path = dir.join("tasks.json");
    config.shutdown.drain_timeout = Duration::from_secs(5);
    config
}

/// Helper to create a test BatchDownloader backed by `fetcher`.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader(
    fetcher: Arc<FakeFetcher>,
) -> (BatchDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let downloader = BatchDownloader::with_fetcher(test_config(temp_dir.path()), fetcher)
        .await
        .unwrap();
    (downloader, temp_dir)
}

/// Poll until task `id` reaches `status`, failing the test after five seconds
pub(crate) async fn wait_for_status(downloader: &BatchDownloader, id: TaskId, status: Status) -> Task {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let task = downloader.get_task(id).await.unwrap();
        if task.status == status {
            return task;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {} stuck in {:?}, expected {:?}",
            id,
            task.status,
            status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Owned URL list
pub(crate) fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|u| u.to_string()).collect()
}
