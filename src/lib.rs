//! # batch-dl
//!
//! Batch file downloader service.
//!
//! Clients submit a list of URLs as a task. Each task is downloaded in the
//! background, one URL at a time, and its status and failed URLs can be
//! polled over HTTP. Task state is saved to a JSON snapshot at shutdown (and
//! optionally on an interval) so unfinished tasks resume after a restart.
//!
//! ## Quick Start
//!
//! ```no_run
//! use batch_dl::{BatchDownloader, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = BatchDownloader::new(Config::default()).await?;
//!     downloader.restore().await?;
//!
//!     let task = downloader
//!         .create_task(vec!["https://example.com/a.txt".to_string()])
//!         .await?;
//!     println!("queued {}", task.id);
//!
//!     downloader.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Task orchestration (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Single-URL downloads
pub mod fetcher;
/// In-memory task table
pub mod registry;
/// JSON snapshot persistence
pub mod store;
/// Worker tracking and shutdown draining
pub mod supervisor;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use downloader::BatchDownloader;
pub use error::{ApiError, Error, ErrorDetail, FetchError, Result, TaskError, ToHttpStatus};
pub use fetcher::{Fetcher, HttpFetcher};
pub use types::{CreateTaskRequest, Status, Task, TaskId, TaskStatus};

/// Serve the API until a termination signal, then shut the downloader down.
///
/// The API keeps answering while the downloader drains, so new submissions
/// get `503` and status lookups still work. The server stops once
/// [`BatchDownloader::shutdown`] returns.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Returns early with the server's error if the API cannot start (for
/// example when the bind address is taken).
///
/// # Example
///
/// ```no_run
/// use batch_dl::{BatchDownloader, Config, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = Arc::new(BatchDownloader::new(Config::default()).await?);
///     downloader.restore().await?;
///
///     run_with_shutdown(downloader).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: Arc<BatchDownloader>) -> Result<()> {
    let stop_server = CancellationToken::new();
    let mut server = tokio::spawn(api::start_api_server(
        downloader.clone(),
        stop_server.clone().cancelled_owned(),
    ));

    tokio::select! {
        signal = wait_for_signal() => {
            tracing::info!(signal = signal.as_str(), "Shutdown requested, draining tasks");
        }
        result = &mut server => {
            // The server exited before any signal
            return match result {
                Ok(result) => result,
                Err(e) => Err(Error::ApiServerError(e.to_string())),
            };
        }
    }

    let shutdown_result = downloader.shutdown().await;

    stop_server.cancel();
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "API server stopped with error"),
        Err(e) => tracing::warn!(error = %e, "API server task failed"),
    }

    shutdown_result
}

/// Signal that started a shutdown
#[cfg_attr(not(unix), allow(dead_code))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShutdownSignal {
    Terminate,
    Interrupt,
    CtrlC,
}

impl ShutdownSignal {
    fn as_str(self) -> &'static str {
        match self {
            ShutdownSignal::Terminate => "SIGTERM",
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::CtrlC => "ctrl-c",
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> ShutdownSignal {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in sandboxes; fall back to whichever source works
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut term), Ok(mut int)) => tokio::select! {
            _ = term.recv() => ShutdownSignal::Terminate,
            _ = int.recv() => ShutdownSignal::Interrupt,
        },
        (Ok(mut term), Err(e)) => {
            tracing::warn!(error = %e, "SIGINT unavailable, tasks drain on SIGTERM only");
            term.recv().await;
            ShutdownSignal::Terminate
        }
        (Err(e), Ok(mut int)) => {
            tracing::warn!(error = %e, "SIGTERM unavailable, tasks drain on SIGINT only");
            int.recv().await;
            ShutdownSignal::Interrupt
        }
        (Err(term_err), Err(int_err)) => {
            tracing::error!(
                sigterm_error = %term_err,
                sigint_error = %int_err,
                "No signal handlers registered, tasks drain on ctrl-c"
            );
            wait_for_ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> ShutdownSignal {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> ShutdownSignal {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Cannot listen for ctrl-c, draining tasks now");
    }
    ShutdownSignal::CtrlC
}
