//! Background service starters.

use super::BatchDownloader;

impl BatchDownloader {
    /// Start periodic snapshot saving
    ///
    /// Does nothing unless `persistence.checkpoint_interval` is set. The task
    /// runs until [`shutdown`](Self::shutdown) is called; shutdown waits for a
    /// checkpoint already in progress before writing its own snapshot.
    pub fn start_checkpointing(&self) -> tokio::task::JoinHandle<()> {
        let Some(period) = self.config.persistence.checkpoint_interval else {
            tracing::info!("Checkpoint interval not configured, state is saved at shutdown only");
            return tokio::spawn(async {});
        };

        let downloader = self.clone();
        let stop = self.background.clone();

        let handle = self.background_tasks.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = downloader.save_state().await {
                            tracing::error!(error = %e, "Checkpoint failed");
                        } else {
                            tracing::debug!("Checkpoint saved");
                        }
                    }
                }
            }

            tracing::debug!("Checkpointing stopped");
        });

        tracing::info!(interval_secs = period.as_secs(), "Checkpointing started");
        handle
    }
}
