//! Task creation, lookup and worker spawning.

use crate::error::{Error, Result, TaskError};
use crate::types::{Task, TaskId, TaskStatus};

use super::BatchDownloader;
use super::worker;

impl BatchDownloader {
    /// Register a new task for `urls` and start downloading it
    ///
    /// Returns the task as created (status `queued`). Fails with
    /// [`Error::ShuttingDown`] once shutdown has begun.
    pub async fn create_task(&self, urls: Vec<String>) -> Result<Task> {
        if !self.supervisor.is_accepting() {
            return Err(Error::ShuttingDown);
        }

        let task = self.registry.create(urls).await;
        tracing::info!(task_id = %task.id, url_count = task.urls.len(), "Task created");

        match self.spawn_worker(task.id).await {
            Ok(_) => {}
            Err(Error::ShuttingDown) => {
                // Shutdown began between the check above and the spawn; the
                // task stays queued and is picked up on the next start.
                tracing::warn!(task_id = %task.id, "Shutdown started, task left queued");
            }
            Err(e) => return Err(e),
        }

        Ok(task)
    }

    /// Look up a task
    pub async fn get_task(&self, id: TaskId) -> Result<Task> {
        self.registry.get(id).await.ok_or_else(|| {
            Error::Task(TaskError::NotFound {
                id: id.to_string(),
            })
        })
    }

    /// Status and failed URLs of a task
    pub async fn task_status(&self, id: TaskId) -> Result<TaskStatus> {
        self.get_task(id).await.map(TaskStatus::from)
    }

    /// Look up a task by its textual id
    ///
    /// An id that does not parse is reported as not found, like any other
    /// unknown id.
    pub async fn find_task(&self, raw_id: &str) -> Result<Task> {
        let id: TaskId = raw_id.parse().map_err(|_| {
            Error::Task(TaskError::NotFound {
                id: raw_id.to_string(),
            })
        })?;
        self.get_task(id).await
    }

    /// Spawn the worker for `id` under the supervisor
    ///
    /// Returns `Ok(false)` if a worker for this task is already running.
    pub(crate) async fn spawn_worker(&self, id: TaskId) -> Result<bool> {
        let registry = self.registry.clone();
        let fetcher = self.fetcher.clone();

        self.supervisor
            .spawn(id, move |cancel| async move {
                let outcome = worker::run_task(registry, fetcher, id, cancel).await;
                tracing::debug!(task_id = %id, ?outcome, "Worker exited");
            })
            .await
    }
}
