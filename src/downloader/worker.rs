//! The per-task download loop.
//!
//! A worker takes a task from its saved cursor to the end of its URL list,
//! one URL at a time. Progress is written back to the registry after every
//! attempt, so a snapshot taken at any point reflects what was done.

use crate::fetcher::Fetcher;
use crate::registry::TaskRegistry;
use crate::types::{Attempt, Status, TaskId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How a worker run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WorkerOutcome {
    /// Every URL was attempted and the task is completed
    Completed,
    /// Cancellation was observed between URLs; the task stays running
    Cancelled,
    /// The task had already completed before the worker started
    AlreadyCompleted,
    /// The task is not in the registry
    Missing,
}

/// Drive task `id` to completion
pub(crate) async fn run_task(
    registry: Arc<TaskRegistry>,
    fetcher: Arc<dyn Fetcher>,
    id: TaskId,
    cancel: CancellationToken,
) -> WorkerOutcome {
    if !registry.set_status(id, Status::Running).await {
        tracing::warn!(task_id = %id, "Worker started for unknown task");
        return WorkerOutcome::Missing;
    }

    // Re-read so a task restored from a snapshot resumes at its cursor
    let Some(task) = registry.get(id).await else {
        return WorkerOutcome::Missing;
    };
    if task.status.is_terminal() {
        return WorkerOutcome::AlreadyCompleted;
    }

    tracing::info!(
        task_id = %id,
        url_count = task.urls.len(),
        start_index = task.last_index,
        "Task started"
    );

    for (index, url) in task.urls.iter().enumerate().skip(task.last_index) {
        if cancel.is_cancelled() {
            tracing::info!(task_id = %id, index, "Task cancelled during download");
            return WorkerOutcome::Cancelled;
        }

        let attempt = match fetcher.fetch(url, id).await {
            Ok(path) => {
                tracing::debug!(task_id = %id, index, path = %path.display(), "URL downloaded");
                Attempt::Succeeded
            }
            Err(e) => {
                tracing::warn!(task_id = %id, index, url = %url, error = %e, "File download error");
                Attempt::Failed
            }
        };
        registry.record_attempt(id, index, attempt).await;
    }

    registry.set_status(id, Status::Completed).await;

    let failed_count = registry.get(id).await.map(|t| t.failed.len()).unwrap_or(0);
    tracing::info!(task_id = %id, failed_count, "Task completed");

    WorkerOutcome::Completed
}
