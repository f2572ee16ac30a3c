//! Rehearsal endpoints, including task membership and maintenance

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chorus_common::api::types::ApiResponse;
use chorus_common::models::{
    NewRehearsal, RecordRef, RehearsalPatch, ResolvedRehearsal, ResolvedTask,
};
use chorus_common::time::parse_date;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::services::rehearsals::{self, CleanupReport};
use crate::AppState;

/// Optional date bounds for `GET /api/rehearsals`
#[derive(Debug, Default, Deserialize)]
pub struct RehearsalQuery {
    /// Inclusive lower bound
    pub from: Option<String>,
    /// Exclusive upper bound
    pub to: Option<String>,
}

/// Body of `PUT /api/rehearsals/:id/tasks/reorder`
#[derive(Debug, Deserialize)]
pub struct ReorderTasksRequest {
    pub tasks: Vec<RecordRef>,
}

/// GET /api/rehearsals
pub async fn list_rehearsals(
    State(state): State<AppState>,
    Query(query): Query<RehearsalQuery>,
) -> ApiResult<Json<ApiResponse<Vec<ResolvedRehearsal>>>> {
    let from = query.from.as_deref().map(parse_date).transpose()?;
    let to = query.to.as_deref().map(parse_date).transpose()?;

    let list = rehearsals::list(&state.db, from, to).await?;
    Ok(Json(ApiResponse::data(list)))
}

/// POST /api/rehearsals
pub async fn create_rehearsal(
    State(state): State<AppState>,
    body: Result<Json<NewRehearsal>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ResolvedRehearsal>>)> {
    let Json(new_rehearsal) = body?;
    let rehearsal = rehearsals::create(&state.db, new_rehearsal).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(rehearsal))))
}

/// PUT /api/rehearsals/:id
pub async fn update_rehearsal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<RehearsalPatch>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<ResolvedRehearsal>>> {
    let Json(patch) = body?;
    let rehearsal = rehearsals::update(&state.db, &id, patch).await?;
    Ok(Json(ApiResponse::data(rehearsal)))
}

/// DELETE /api/rehearsals/:id
pub async fn delete_rehearsal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    rehearsals::delete(&state.db, &id).await?;
    Ok(Json(ApiResponse::message("Rehearsal deleted")))
}

/// POST /api/rehearsals/:id/tasks/:task_id
pub async fn add_task(
    State(state): State<AppState>,
    Path((id, task_id)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<ResolvedRehearsal>>> {
    let rehearsal = rehearsals::add_task(&state.db, &id, &task_id).await?;
    Ok(Json(ApiResponse::data(rehearsal)))
}

/// DELETE /api/rehearsals/:id/tasks/:task_id
///
/// Deletes the task itself, not only its membership.
pub async fn remove_task(
    State(state): State<AppState>,
    Path((id, task_id)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<ResolvedRehearsal>>> {
    let rehearsal =
        rehearsals::detach_and_delete_task(&state.db, &state.recordings, &id, &task_id).await?;
    Ok(Json(ApiResponse::data(rehearsal)))
}

/// PUT /api/rehearsals/:id/tasks/reorder
pub async fn reorder_tasks(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ReorderTasksRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Vec<ResolvedTask>>>> {
    let Json(request) = body?;
    let tasks = rehearsals::reorder_tasks(&state.db, &id, &request.tasks).await?;
    Ok(Json(ApiResponse::data(tasks)))
}

/// DELETE /api/rehearsals/cleanup/empty-rehearsals
pub async fn cleanup_empty_rehearsals(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<u64>>> {
    let removed = rehearsals::cleanup_empty_rehearsals(&state.db).await?;
    Ok(Json(ApiResponse {
        success: true,
        data: Some(removed),
        message: Some(format!("Deleted {} empty rehearsals", removed)),
    }))
}

/// DELETE /api/rehearsals/cleanup/invalid-tasks
pub async fn cleanup_invalid_tasks(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<CleanupReport>>> {
    let report = rehearsals::cleanup_invalid_tasks(&state.db, &state.recordings).await?;
    Ok(Json(ApiResponse {
        success: true,
        message: Some(format!(
            "Cleaned up {} invalid tasks and {} empty rehearsals",
            report.tasks_removed, report.rehearsals_removed
        )),
        data: Some(report),
    }))
}
