//! OpenAPI documentation and schema generation

use utoipa::OpenApi;

/// OpenAPI documentation for the batch-dl REST API
///
/// Served at `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "batch-dl REST API",
        version = "0.1.0",
        description = "Submit batches of URLs for background download and poll their progress",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Tasks
        crate::api::routes::create_task,
        crate::api::routes::task_status,
        crate::api::routes::get_task,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::Status,
        crate::types::Task,
        crate::types::TaskStatus,
        crate::types::CreateTaskRequest,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "tasks", description = "Task submission and status"),
        (name = "system", description = "Health and API documentation")
    )
)]
pub struct ApiDoc;
