//! Single-URL downloader.
//!
//! [`Fetcher`] is the seam between the task worker and the network: the
//! worker only needs "download this URL for this task", and tests can
//! plug in their own implementation. [`HttpFetcher`] is the production
//! implementation built on `reqwest`.

use crate::config::DownloadConfig;
use crate::error::{FetchError, Result};
use crate::types::TaskId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Fallback file name when a URL has neither a path segment nor a host
const FALLBACK_FILE_NAME: &str = "download";

/// Downloads one URL to local storage on behalf of a task
///
/// Implementations must not retry and must not touch task state; the
/// caller records the outcome.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and return the path of the written file
    async fn fetch(&self, url: &str, task_id: TaskId) -> std::result::Result<PathBuf, FetchError>;

    /// Name of this fetcher for logging
    fn name(&self) -> &'static str;
}

/// HTTP GET fetcher writing into the configured download directory
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    download_dir: PathBuf,
    file_prefix: String,
}

impl HttpFetcher {
    /// Create a fetcher for the given output settings
    ///
    /// No request timeout is set: downloads may take arbitrarily long and
    /// are only bounded by the shutdown drain.
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("batch-dl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            download_dir: config.download_dir.clone(),
            file_prefix: config.file_prefix.clone(),
        })
    }

    /// Output path for a resource, given the final (post-redirect) URL
    pub fn output_path(&self, task_id: TaskId, final_url: &url::Url) -> PathBuf {
        output_path(&self.download_dir, &self.file_prefix, task_id, final_url)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, task_id: TaskId) -> std::result::Result<PathBuf, FetchError> {
        let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                source: e,
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let path = self.output_path(task_id, response.url());
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| FetchError::Io {
                path: path.clone(),
                source: e,
            })?;

        let copied = async {
            let mut written: u64 = 0;
            while let Some(chunk) = response.chunk().await.map_err(|e| FetchError::Request {
                url: url.to_string(),
                source: e,
            })? {
                file.write_all(&chunk).await.map_err(|e| FetchError::Io {
                    path: path.clone(),
                    source: e,
                })?;
                written += chunk.len() as u64;
            }
            file.flush().await.map_err(|e| FetchError::Io {
                path: path.clone(),
                source: e,
            })?;
            Ok::<u64, FetchError>(written)
        }
        .await;

        match copied {
            Ok(bytes) => {
                tracing::debug!(task_id = %task_id, url, bytes, path = %path.display(), "File downloaded");
                Ok(path)
            }
            Err(e) => {
                drop(file);
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    tracing::debug!(path = %path.display(), error = %remove_err, "Could not remove partial file");
                }
                Err(e)
            }
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Build `<dir>/<prefix><task id>_<base name>`
fn output_path(dir: &Path, prefix: &str, task_id: TaskId, final_url: &url::Url) -> PathBuf {
    dir.join(format!("{}{}_{}", prefix, task_id, base_name(final_url)))
}

/// Last non-empty path segment of the URL, else its host, else a fixed name
fn base_name(url: &url::Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(|s| {
            urlencoding::decode(s)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| s.to_string())
        });

    let name = segment
        .or_else(|| url.host_str().map(str::to_string))
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());

    sanitize(&name)
}

/// Keep the name a single path component
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => FALLBACK_FILE_NAME.to_string(),
        _ => cleaned,
    }
}
