//! Application state for the API server

use crate::BatchDownloader;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The downloader that owns every task
    pub downloader: Arc<BatchDownloader>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<BatchDownloader>) -> Self {
        Self { downloader }
    }
}
