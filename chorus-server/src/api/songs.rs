//! Song endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chorus_common::api::types::ApiResponse;
use chorus_common::models::{NewSong, RecordRef, Song, SongPatch};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::services::songs;
use crate::AppState;

/// Body of `PUT /api/songs/reorder/songs`
#[derive(Debug, Deserialize)]
pub struct ReorderSongsRequest {
    pub songs: Vec<RecordRef>,
}

/// GET /api/songs
pub async fn list_songs(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<Song>>>> {
    let songs = songs::list(&state.db).await?;
    Ok(Json(ApiResponse::data(songs)))
}

/// POST /api/songs
pub async fn create_song(
    State(state): State<AppState>,
    body: Result<Json<NewSong>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Song>>)> {
    let Json(new_song) = body?;
    let song = songs::create(&state.db, new_song).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(song))))
}

/// PUT /api/songs/:id
pub async fn update_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<SongPatch>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Song>>> {
    let Json(patch) = body?;
    let song = songs::update(&state.db, &id, patch).await?;
    Ok(Json(ApiResponse::data(song)))
}

/// DELETE /api/songs/:id
pub async fn delete_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    songs::delete(&state.db, &id).await?;
    Ok(Json(ApiResponse::message("Song deleted")))
}

/// PUT /api/songs/reorder/songs
///
/// Each song's position becomes its index in the submitted list.
pub async fn reorder_songs(
    State(state): State<AppState>,
    body: Result<Json<ReorderSongsRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let Json(request) = body?;
    let ids: Vec<String> = request
        .songs
        .iter()
        .map(|song| song.id_str().to_string())
        .collect();

    songs::reorder(&state.db, &ids).await?;
    Ok(Json(ApiResponse::message("Songs reordered")))
}
