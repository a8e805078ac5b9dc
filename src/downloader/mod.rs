//! Task orchestration, split into focused submodules.
//!
//! The `BatchDownloader` struct and its methods are organized by domain:
//! - [`tasks`] - Task creation and lookup
//! - [`worker`] - The per-task download loop
//! - [`lifecycle`] - Startup reconciliation, snapshots and shutdown
//! - [`services`] - Background checkpointing

mod lifecycle;
mod services;
mod tasks;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::registry::TaskRegistry;
use crate::store::StateStore;
use crate::supervisor::Supervisor;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct BatchDownloader {
    /// Every known task
    pub(crate) registry: Arc<TaskRegistry>,
    /// Fetches individual URLs (trait object so tests can substitute it)
    pub(crate) fetcher: Arc<dyn Fetcher>,
    /// Snapshot file
    pub(crate) store: StateStore,
    /// Running workers and the shutdown gate
    pub(crate) supervisor: Supervisor,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Cancelled at shutdown to stop background services
    pub(crate) background: CancellationToken,
    /// Background services, awaited at shutdown before the final saves
    pub(crate) background_tasks: TaskTracker,
}

impl BatchDownloader {
    /// Create a downloader that fetches over HTTP
    ///
    /// Validates the configuration and creates the download directory.
    /// Persisted tasks are not touched until [`restore`](Self::restore) is
    /// called.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::new(&config.download)?;
        Self::with_fetcher(config, Arc::new(fetcher)).await
    }

    /// Create a downloader with a custom [`Fetcher`]
    pub async fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        tracing::info!(
            fetcher = fetcher.name(),
            download_dir = %config.download.download_dir.display(),
            state_path = %config.persistence.state_path.display(),
            "Downloader initialized"
        );

        Ok(Self {
            registry: Arc::new(TaskRegistry::new()),
            fetcher,
            store: StateStore::new(config.persistence.state_path.clone()),
            supervisor: Supervisor::new(),
            config: Arc::new(config),
            background: CancellationToken::new(),
            background_tasks: TaskTracker::new(),
        })
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Number of task workers currently running
    pub async fn active_workers(&self) -> usize {
        self.supervisor.active_count().await
    }

    /// Whether new tasks are still accepted
    pub fn is_accepting(&self) -> bool {
        self.supervisor.is_accepting()
    }
}
