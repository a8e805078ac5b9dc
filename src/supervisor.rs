//! Worker supervision and bounded shutdown drain.
//!
//! Every running task worker has an entry in the supervisor keyed by its task
//! id, holding the worker's cancellation token and abort handle. The entry is
//! removed when the worker exits, so the map size is the in-flight count.

use crate::error::{Error, Result};
use crate::types::TaskId;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

/// Handle to one live worker
#[derive(Debug)]
struct WorkerHandle {
    cancel: CancellationToken,
    abort: AbortHandle,
}

/// Tracks in-flight task workers
#[derive(Clone, Debug)]
pub struct Supervisor {
    workers: Arc<Mutex<HashMap<TaskId, WorkerHandle>>>,
    /// Cleared once shutdown begins
    accepting_new: Arc<AtomicBool>,
    /// Signalled whenever the last worker exits
    idle: Arc<Notify>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    /// Create a supervisor that accepts new workers
    pub fn new() -> Self {
        Self {
            workers: Arc::new(Mutex::new(HashMap::new())),
            accepting_new: Arc::new(AtomicBool::new(true)),
            idle: Arc::new(Notify::new()),
        }
    }

    /// Spawn a worker for `id`
    ///
    /// `worker` receives the cancellation token it must poll. Returns
    /// `Ok(false)` without spawning if a worker for `id` is already live, and
    /// [`Error::ShuttingDown`] once [`stop_accepting`](Self::stop_accepting)
    /// has been called.
    pub async fn spawn<F, Fut>(&self, id: TaskId, worker: F) -> Result<bool>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut workers = self.workers.lock().await;

        if !self.is_accepting() {
            return Err(Error::ShuttingDown);
        }
        if workers.contains_key(&id) {
            tracing::warn!(task_id = %id, "Worker already running, not spawning another");
            return Ok(false);
        }

        let cancel = CancellationToken::new();
        let fut = worker(cancel.clone());

        let registry = self.workers.clone();
        let idle = self.idle.clone();
        // The lock is held until the entry exists, so the exit path below
        // always finds it.
        let handle = tokio::spawn(async move {
            if AssertUnwindSafe(fut).catch_unwind().await.is_err() {
                tracing::error!(task_id = %id, "Task worker panicked");
            }

            let mut workers = registry.lock().await;
            workers.remove(&id);
            if workers.is_empty() {
                idle.notify_waiters();
            }
        });

        workers.insert(
            id,
            WorkerHandle {
                cancel,
                abort: handle.abort_handle(),
            },
        );
        tracing::debug!(task_id = %id, active_count = workers.len(), "Worker spawned");
        Ok(true)
    }

    /// Number of workers still running
    pub async fn active_count(&self) -> usize {
        self.workers.lock().await.len()
    }

    /// Whether a worker for `id` is running
    pub async fn is_active(&self, id: TaskId) -> bool {
        self.workers.lock().await.contains_key(&id)
    }

    /// Signal cancellation to one worker; returns whether it was running
    pub async fn cancel(&self, id: TaskId) -> bool {
        match self.workers.lock().await.get(&id) {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Signal cancellation to every running worker
    ///
    /// Workers stop before their next URL; a download already in progress
    /// is allowed to finish.
    pub async fn cancel_all(&self) {
        let workers = self.workers.lock().await;
        tracing::debug!(active_count = workers.len(), "Cancelling all workers");
        for (id, handle) in workers.iter() {
            tracing::trace!(task_id = %id, "Signalling cancellation");
            handle.cancel.cancel();
        }
    }

    /// Abort every running worker without waiting for it
    ///
    /// Used after a drain timed out; aborted workers are forgotten at once.
    pub async fn abort_all(&self) {
        let mut workers = self.workers.lock().await;
        for (id, handle) in workers.drain() {
            tracing::warn!(task_id = %id, "Aborting worker");
            handle.abort.abort();
        }
        self.idle.notify_waiters();
    }

    /// Refuse all further [`spawn`](Self::spawn) calls
    pub fn stop_accepting(&self) {
        self.accepting_new.store(false, Ordering::SeqCst);
    }

    /// Whether new workers may still be spawned
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Wait for every worker to exit, up to `deadline`
    ///
    /// Returns immediately when nothing is running, and
    /// [`Error::ShutdownTimeout`] if workers remain when the deadline expires.
    pub async fn drain(&self, deadline: Duration) -> Result<()> {
        match tokio::time::timeout(deadline, self.wait_idle()).await {
            Ok(()) => Ok(()),
            Err(_) => Err(Error::ShutdownTimeout {
                timeout: deadline,
                remaining: self.active_count().await,
            }),
        }
    }

    async fn wait_idle(&self) {
        loop {
            // Register before checking so a notification between the check
            // and the await is not missed
            let notified = self.idle.notified();
            let active_count = self.active_count().await;
            if active_count == 0 {
                return;
            }
            tracing::debug!(active_count, "Waiting for workers to finish");
            notified.await;
        }
    }
}
