//! Error types for batch-dl
//!
//! This module provides error handling for the library, including:
//! - The crate-wide [`Error`] type and [`Result`] alias
//! - [`FetchError`], the per-URL failure recorded against a task
//! - HTTP status code mapping for the API layer
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for batch-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for batch-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// Task-related error
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// Request could not be understood
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The persisted state file exists but cannot be decoded
    #[error("corrupt state file {path}: {source}")]
    CorruptState {
        /// Path of the state file
        path: PathBuf,
        /// Decoding error
        source: serde_json::Error,
    },

    /// HTTP client could not be built
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// Workers were still running when the drain deadline expired
    #[error("shutdown timed out after {timeout:?} with {remaining} worker(s) still running")]
    ShutdownTimeout {
        /// The drain deadline
        timeout: Duration,
        /// Workers still in flight when the deadline expired
        remaining: usize,
    },

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Task-related errors
#[derive(Debug, Error)]
pub enum TaskError {
    /// No task with this identifier is known
    #[error("task {id} not found")]
    NotFound {
        /// The identifier as supplied by the caller
        id: String,
    },
}

/// Failure of a single URL download
///
/// Never fatal to a task: the worker records the URL in the task's
/// failed list and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be parsed
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// Connection, TLS or body transfer failure
    #[error("request to {url} failed: {source}")]
    Request {
        /// The requested URL
        url: String,
        /// Underlying client error
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// The requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Output file could not be created or written
    #[error("failed to write {path}: {source}")]
    Io {
        /// Output file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "task_not_found",
///     "message": "task error: task 5f0c... not found",
///     "details": {
///       "task_id": "5f0c..."
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "task_not_found", "invalid_request")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::InvalidRequest(_) => 400,

            // 404 Not Found
            Error::Task(TaskError::NotFound { .. }) => 404,

            // 500 Internal Server Error - Server-side issues
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::CorruptState { .. } => 500,
            Error::ApiServerError(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
            Error::ShutdownTimeout { .. } => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Task(e) => match e {
                TaskError::NotFound { .. } => "task_not_found",
            },
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::CorruptState { .. } => "corrupt_state",
            Error::Network(_) => "network_error",
            Error::ShuttingDown => "shutting_down",
            Error::ShutdownTimeout { .. } => "shutdown_timeout",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Task(TaskError::NotFound { id }) => Some(serde_json::json!({
                "task_id": id,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::ShutdownTimeout { timeout, remaining } => Some(serde_json::json!({
                "timeout_secs": timeout.as_secs(),
                "remaining_workers": remaining,
            })),
            _ => None,
        };

        match details {
            Some(details) => ApiError::with_details(code, message, details),
            None => ApiError::new(code, message),
        }
    }
}
