//! Task snapshot persistence.
//!
//! The whole registry is stored as one JSON object mapping task id to the
//! full task record. Saves go to a sibling temporary file that is renamed
//! over the real one, so a crash mid-save leaves the previous snapshot intact.
//! Saves through one store (and its clones) are serialized, since they share
//! the temporary file.

use crate::error::{Error, Result};
use crate::types::{Task, TaskId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Reads and writes registry snapshots
#[derive(Clone, Debug)]
pub struct StateStore {
    path: PathBuf,
    /// Held from temp file creation through the rename
    save_lock: Arc<Mutex<()>>,
}

impl StateStore {
    /// Create a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Snapshot file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored snapshot with `tasks`
    pub async fn save(&self, tasks: &HashMap<TaskId, Task>) -> Result<()> {
        let encoded = serde_json::to_vec(tasks)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let _guard = self.save_lock.lock().await;

        let tmp_path = self.tmp_path();
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&encoded).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path).await?;

        tracing::debug!(
            path = %self.path.display(),
            task_count = tasks.len(),
            "Snapshot saved"
        );
        Ok(())
    }

    /// Read the stored snapshot
    ///
    /// Returns `Ok(None)` when no snapshot exists yet (an empty file counts
    /// as none). Content that cannot be decoded is [`Error::CorruptState`].
    pub async fn load(&self) -> Result<Option<HashMap<TaskId, Task>>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No snapshot found, starting fresh");
                return Ok(None);
            }
            Err(e) => return Err(Error::Io(e)),
        };

        if raw.iter().all(u8::is_ascii_whitespace) {
            tracing::debug!(path = %self.path.display(), "Snapshot file is empty, starting fresh");
            return Ok(None);
        }

        let tasks: HashMap<TaskId, Task> =
            serde_json::from_slice(&raw).map_err(|source| Error::CorruptState {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(
            path = %self.path.display(),
            task_count = tasks.len(),
            "Snapshot loaded"
        );
        Ok(Some(tasks))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Status;

    fn sample_tasks() -> HashMap<TaskId, Task> {
        let mut running = Task::new(
            TaskId::new(),
            vec!["http://x/a".to_string(), "http://x/b".to_string()],
        );
        running.status = Status::Running;
        running.failed.push("http://x/a".to_string());
        running.last_index = 1;

        let queued = Task::new(TaskId::new(), vec!["http://x/c".to_string()]);

        [running, queued].into_iter().map(|t| (t.id, t)).collect()
    }

    #[tokio::test]
    async fn save_then_load_returns_same_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("tasks.json"));
        let tasks = sample_tasks();

        store.save(&tasks).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();

        assert_eq!(loaded, tasks);
        assert!(!dir.path().join("tasks.json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_file_is_a_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("tasks.json"));

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_file_is_a_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "").unwrap();

        assert!(StateStore::new(path).load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_file_is_corrupt_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "{\"tasks\": [").unwrap();

        let err = StateStore::new(path.clone()).load().await.unwrap_err();
        assert!(matches!(err, Error::CorruptState { path: p, .. } if p == path));
    }

    #[tokio::test]
    async fn save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("tasks.json"));

        store.save(&sample_tasks()).await.unwrap();
        store.save(&HashMap::new()).await.unwrap();

        assert!(store.load().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_saves_never_leave_a_torn_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("tasks.json"));

        let big: HashMap<TaskId, Task> = (0..200)
            .map(|i| {
                let task = Task::new(TaskId::new(), vec![format!("http://x/file{i}")]);
                (task.id, task)
            })
            .collect();
        let empty = HashMap::new();
        // Clones share the lock, like the downloader and its checkpoint task
        let other = store.clone();

        for _ in 0..100 {
            let (a, b) = tokio::join!(store.save(&big), other.save(&empty));
            a.unwrap();
            b.unwrap();

            let loaded = store.load().await.unwrap().unwrap();
            assert!(loaded.is_empty() || loaded.len() == big.len());
        }
        assert!(!dir.path().join("tasks.json.tmp").exists());
    }

    #[tokio::test]
    async fn save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state").join("tasks.json"));

        store.save(&sample_tasks()).await.unwrap();

        assert_eq!(store.load().await.unwrap().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn snapshot_layout_is_id_to_task_map() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("tasks.json"));
        let tasks = sample_tasks();
        store.save(&tasks).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        for (id, task) in &tasks {
            let record = &raw[id.to_string()];
            assert_eq!(record["status"], task.status.as_str());
            assert_eq!(record["lastIndex"], task.last_index);
        }
    }
}
