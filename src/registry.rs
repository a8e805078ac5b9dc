//! In-memory task registry.
//!
//! Every task lives here and every mutation goes through one of the
//! operations below. A single mutex guards the whole map and is only held for
//! the duration of a map operation, never across a download.

use crate::types::{Attempt, Status, Task, TaskId};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Synchronized store of all known tasks
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<TaskId, Task>>,
}

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new queued task for `urls` and return a copy of it
    pub async fn create(&self, urls: Vec<String>) -> Task {
        let mut tasks = self.tasks.lock().await;

        // v4 collisions are practically impossible, but the id must never be reused
        let mut id = TaskId::new();
        while tasks.contains_key(&id) {
            id = TaskId::new();
        }

        let task = Task::new(id, urls);
        tasks.insert(id, task.clone());
        task
    }

    /// Look up a task
    pub async fn get(&self, id: TaskId) -> Option<Task> {
        self.tasks.lock().await.get(&id).cloned()
    }

    /// Overwrite a task's status
    ///
    /// Unknown ids are ignored; returns whether the task exists. A completed
    /// task is never moved back to an earlier status.
    pub async fn set_status(&self, id: TaskId, status: Status) -> bool {
        let mut tasks = self.tasks.lock().await;
        let Some(task) = tasks.get_mut(&id) else {
            return false;
        };

        if task.status.is_terminal() && status != task.status {
            tracing::warn!(
                task_id = %id,
                requested = %status,
                "Ignoring status change for completed task"
            );
            return true;
        }

        task.status = status;
        true
    }

    /// Record the outcome of attempting `urls[index]`
    ///
    /// Advances the cursor to `index` (never backwards) and appends the URL
    /// to the failed list when the attempt failed. Re-attempting the cursor
    /// after a failure there does not record the URL a second time.
    pub async fn record_attempt(&self, id: TaskId, index: usize, attempt: Attempt) -> bool {
        let mut tasks = self.tasks.lock().await;
        let Some(task) = tasks.get_mut(&id) else {
            return false;
        };
        let Some(url) = task.urls.get(index).cloned() else {
            tracing::warn!(task_id = %id, index, "Attempt index out of range");
            return true;
        };

        let failed = attempt == Attempt::Failed;
        let repeated = index == task.last_index && task.cursor_failed;
        if failed && !repeated {
            task.failed.push(url);
        }
        if index >= task.last_index {
            task.last_index = index;
            task.cursor_failed = failed;
        }
        true
    }

    /// Consistent copy of every task, taken under the lock
    pub async fn snapshot(&self) -> HashMap<TaskId, Task> {
        self.tasks.lock().await.clone()
    }

    /// Insert previously persisted tasks, replacing entries with the same id
    pub async fn restore(&self, loaded: HashMap<TaskId, Task>) {
        let mut tasks = self.tasks.lock().await;
        for (id, mut task) in loaded {
            // The map key is authoritative
            task.id = id;
            tasks.insert(id, task);
        }
    }

    /// Number of tasks
    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Whether the registry holds no tasks
    pub async fn is_empty(&self) -> bool {
        self.tasks.lock().await.is_empty()
    }
}
