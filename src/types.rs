//! Core types for batch-dl

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a task
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Task status
///
/// Moves only forward: `Queued` → `Running` → `Completed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Created, worker not started yet
    Queued,
    /// Worker is attempting URLs (or was interrupted while doing so)
    Running,
    /// Every URL has been attempted, successfully or not
    Completed,
}

impl Status {
    /// Whether no more work will be attempted for the task
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed)
    }

    /// Lowercase name as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Queued => "queued",
            Status::Running => "running",
            Status::Completed => "completed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One batch of URLs and its download progress
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task identifier
    #[schema(value_type = String)]
    pub id: TaskId,
    /// Files to fetch, in attempt order
    pub urls: Vec<String>,
    /// Current status
    pub status: Status,
    /// URLs whose download attempt errored, in attempt order
    #[serde(default)]
    pub failed: Vec<String>,
    /// Most recent index into `urls` processed by the worker
    #[serde(default)]
    pub last_index: usize,
    /// Whether the attempt at `last_index` failed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cursor_failed: bool,
}

impl Task {
    /// Build a freshly queued task
    pub fn new(id: TaskId, urls: Vec<String>) -> Self {
        Self {
            id,
            urls,
            status: Status::Queued,
            failed: Vec::new(),
            last_index: 0,
            cursor_failed: false,
        }
    }
}

/// Outcome of a single URL attempt, as recorded against a task
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
    /// File written to disk
    Succeeded,
    /// Transport or local I/O error
    Failed,
}

/// Body of `POST /download`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    /// URLs to download
    pub files: Vec<String>,
}

/// Body of `GET /status/{id}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TaskStatus {
    /// Current status
    pub status: Status,
    /// URLs that could not be downloaded
    #[serde(rename = "failedToDownload")]
    pub failed_to_download: Vec<String>,
}

impl From<Task> for TaskStatus {
    fn from(task: Task) -> Self {
        Self {
            status: task.status,
            failed_to_download: task.failed,
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_serializes_with_camel_case_cursor() {
        let id = TaskId::new();
        let task = Task::new(id, vec!["http://x/a.txt".to_string()]);

        let json = serde_json::to_value(&task).unwrap();

        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["status"], "queued");
        assert_eq!(json["lastIndex"], 0);
        assert_eq!(json["failed"], serde_json::json!([]));
        assert!(json.get("cursorFailed").is_none());
    }

    #[test]
    fn task_from_older_snapshot_defaults_cursor_state() {
        let id = TaskId::new();
        let raw = format!(r#"{{"id":"{id}","urls":["http://x/a"],"status":"running"}}"#);

        let task: Task = serde_json::from_str(&raw).unwrap();

        assert_eq!(task.last_index, 0);
        assert!(task.failed.is_empty());
        assert!(!task.cursor_failed);
    }

    #[test]
    fn status_response_uses_failed_to_download_key() {
        let mut task = Task::new(TaskId::new(), vec!["http://x/missing".to_string()]);
        task.status = Status::Completed;
        task.failed.push("http://x/missing".to_string());

        let json = serde_json::to_value(TaskStatus::from(task)).unwrap();

        assert_eq!(json["status"], "completed");
        assert_eq!(json["failedToDownload"][0], "http://x/missing");
    }

    #[test]
    fn status_order_follows_lifecycle() {
        assert!(Status::Queued < Status::Running);
        assert!(Status::Running < Status::Completed);
        assert!(Status::Completed.is_terminal());
        assert!(!Status::Running.is_terminal());
    }

    #[test]
    fn task_id_parses_from_display() {
        let id = TaskId::new();
        let parsed: TaskId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<TaskId>().is_err());
    }
}
