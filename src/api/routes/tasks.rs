//! Task handlers.

use crate::api::AppState;
use crate::error::Error;
use crate::types::{CreateTaskRequest, TaskStatus};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /download - Submit a new task
#[utoipa::path(
    post,
    path = "/download",
    tag = "tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 200, description = "Task created and queued", body = crate::types::Task),
        (status = 400, description = "Malformed request body", body = crate::error::ApiError),
        (status = 503, description = "Service is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected task request");
            return Error::InvalidRequest(rejection.body_text()).into_response();
        }
    };

    match state.downloader.create_task(request.files).await {
        Ok(task) => (StatusCode::OK, Json(task)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /status/:id - Task status and failed URLs
#[utoipa::path(
    get,
    path = "/status/{id}",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task status", body = TaskStatus),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn task_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.downloader.find_task(&id).await {
        Ok(task) => (StatusCode::OK, Json(TaskStatus::from(task))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /tasks/:id - Full task record
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task record", body = crate::types::Task),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.downloader.find_task(&id).await {
        Ok(task) => (StatusCode::OK, Json(task)).into_response(),
        Err(e) => e.into_response(),
    }
}
