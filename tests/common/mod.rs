//! Shared helpers for integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use batch_dl::{BatchDownloader, Config, Status, Task, TaskId};
use std::path::Path;
use std::time::Duration;

/// Config with every path inside `dir` and a short drain timeout
pub fn config_in(dir: &Path) -> Config {
    let mut config = Config::default();
    config.download.download_dir = dir.join("files");
    config.persistence.state_path = dir.join("tasks.json");
    config.shutdown.drain_timeout = Duration::from_secs(5);
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    config
}

/// Poll until task `id` reaches `status`
pub async fn wait_for_status(downloader: &BatchDownloader, id: TaskId, status: Status) -> Task {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let task = downloader.get_task(id).await.unwrap();
        if task.status == status {
            return task;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {} stuck in {}, expected {}",
            id,
            task.status,
            status
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Names of the files written to `dir`, sorted
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
