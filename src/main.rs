use batch_dl::{BatchDownloader, Config, Error, run_with_shutdown};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Batch file download service
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// JSON config file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the API bind address
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Exiting with failure");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Cli) -> batch_dl::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(bind) = args.bind {
        config.server.api.bind_address = bind;
    }

    let downloader = Arc::new(BatchDownloader::new(config).await?);

    let restarted = downloader.restore().await.inspect_err(|e| {
        if let Error::CorruptState { path, .. } = e {
            error!(path = %path.display(), "Saved task state is unreadable, refusing to start");
        }
    })?;
    info!(restarted, "Ready to accept tasks");

    let checkpointing = downloader.start_checkpointing();

    let result = run_with_shutdown(downloader).await;
    checkpointing.abort();
    result
}
