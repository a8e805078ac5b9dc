//! Startup reconciliation, snapshots and shutdown coordination.

use crate::error::Result;
use crate::types::TaskId;

use super::BatchDownloader;

impl BatchDownloader {
    /// Load the persisted snapshot and restart unfinished tasks
    ///
    /// Run once at startup, before serving requests. Every loaded task that
    /// is not completed gets a worker that resumes at its saved cursor.
    /// A missing snapshot is a cold start; a corrupt one is an error the
    /// caller should treat as fatal.
    ///
    /// Returns the number of restarted tasks.
    pub async fn restore(&self) -> Result<usize> {
        let Some(loaded) = self.store.load().await? else {
            tracing::info!("No saved tasks, starting fresh");
            return Ok(0);
        };

        let total = loaded.len();
        let mut unfinished: Vec<TaskId> = loaded
            .iter()
            .filter(|(_, task)| !task.status.is_terminal())
            .map(|(id, _)| *id)
            .collect();
        unfinished.sort();

        self.registry.restore(loaded).await;

        let mut restarted = 0;
        for id in unfinished {
            if self.spawn_worker(id).await? {
                restarted += 1;
            }
        }

        tracing::info!(
            task_count = total,
            restarted,
            "Restored tasks from snapshot"
        );
        Ok(restarted)
    }

    /// Write the current registry snapshot to the state file
    pub async fn save_state(&self) -> Result<()> {
        let snapshot = self.registry.snapshot().await;
        self.store.save(&snapshot).await
    }

    /// Gracefully shut down the downloader
    ///
    /// 1. Stops accepting new tasks and waits for background services to stop
    /// 2. Signals cancellation to every worker (they stop before their next URL)
    /// 3. Persists the registry snapshot
    /// 4. Waits for workers to exit, up to the configured drain timeout
    /// 5. Persists again if the drain finished in time
    ///
    /// A failed save is logged and does not stop the sequence. If the drain
    /// times out the remaining workers are aborted and
    /// [`Error::ShutdownTimeout`](crate::Error::ShutdownTimeout) is returned;
    /// progress made after step 3 by those workers is lost.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new tasks
        self.supervisor.stop_accepting();
        self.background.cancel();
        tracing::info!("Stopped accepting new tasks");

        // A checkpoint in progress would race the saves below
        self.background_tasks.close();
        self.background_tasks.wait().await;

        // 2. Ask workers to stop at the next URL boundary
        self.supervisor.cancel_all().await;

        // 3. Persist state
        match self.save_state().await {
            Ok(()) => tracing::info!("Task state saved"),
            Err(e) => tracing::error!(error = %e, "Error saving tasks"),
        }

        // 4. Wait for workers with a deadline
        let drain_timeout = self.config.shutdown.drain_timeout;
        if let Err(e) = self.supervisor.drain(drain_timeout).await {
            tracing::warn!(error = %e, "Shutdown timeout exceeded");
            self.supervisor.abort_all().await;
            return Err(e);
        }
        tracing::info!("All workers stopped");

        // 5. Capture progress made while draining
        if let Err(e) = self.save_state().await {
            tracing::error!(error = %e, "Error saving final task state");
        }

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }
}
