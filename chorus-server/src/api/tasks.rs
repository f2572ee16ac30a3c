//! Task endpoints
//!
//! Create and update take `multipart/form-data` so a recording can travel
//! with the task fields.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chorus_common::api::types::ApiResponse;
use chorus_common::models::ResolvedTask;
use tracing::debug;

use crate::error::ApiResult;
use crate::services::tasks::{self, TaskForm};
use crate::uploads::Upload;
use crate::AppState;

/// Name of the file field carrying the recording
const RECORDING_FIELD: &str = "recording";

/// GET /api/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<ResolvedTask>>>> {
    let tasks = tasks::list(&state.db).await?;
    Ok(Json(ApiResponse::data(tasks)))
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ApiResponse<ResolvedTask>>)> {
    let form = read_task_form(multipart).await?;
    let task = tasks::create(&state.db, &state.recordings, form).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(task))))
}

/// PATCH /api/tasks/:id
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<ApiResponse<ResolvedTask>>> {
    let form = read_task_form(multipart).await?;
    let task = tasks::update(&state.db, &state.recordings, &id, form).await?;
    Ok(Json(ApiResponse::data(task)))
}

/// DELETE /api/tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    tasks::delete(&state.db, &state.recordings, &id).await?;
    Ok(Json(ApiResponse::message("Task deleted")))
}

/// Collect the known form fields; anything else is ignored
async fn read_task_form(mut multipart: Multipart) -> ApiResult<TaskForm> {
    let mut form = TaskForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == RECORDING_FIELD {
            let original_name = field.file_name().map(str::to_string);
            let bytes = field.bytes().await?;
            // Browsers send an empty part when no file was picked
            if bytes.is_empty() && original_name.as_deref().unwrap_or_default().is_empty() {
                continue;
            }
            form.recording = Some(Upload {
                original_name,
                bytes,
            });
            continue;
        }

        let slot = match name.as_str() {
            "taskType" => &mut form.task_type,
            "song" => &mut form.song,
            "description" => &mut form.description,
            "date" => &mut form.date,
            "completed" => &mut form.completed,
            other => {
                debug!("Ignoring unknown task form field '{}'", other);
                continue;
            }
        };
        *slot = Some(field.text().await?);
    }

    Ok(form)
}
