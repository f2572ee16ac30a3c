//! HTTP API handlers for chorus-server

pub mod health;
pub mod rehearsals;
pub mod songs;
pub mod tasks;

use axum::routing::{delete, get, patch, post, put};
use axum::Router;

use crate::AppState;

pub use health::health_routes;

/// Routes mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Songs
        .route("/songs", get(songs::list_songs).post(songs::create_song))
        .route("/songs/reorder/songs", put(songs::reorder_songs))
        .route("/songs/:id", put(songs::update_song).delete(songs::delete_song))
        // Tasks
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/:id",
            patch(tasks::update_task).delete(tasks::delete_task),
        )
        // Rehearsals
        .route(
            "/rehearsals",
            get(rehearsals::list_rehearsals).post(rehearsals::create_rehearsal),
        )
        .route(
            "/rehearsals/cleanup/empty-rehearsals",
            delete(rehearsals::cleanup_empty_rehearsals),
        )
        .route(
            "/rehearsals/cleanup/invalid-tasks",
            delete(rehearsals::cleanup_invalid_tasks),
        )
        .route(
            "/rehearsals/:id",
            put(rehearsals::update_rehearsal).delete(rehearsals::delete_rehearsal),
        )
        .route("/rehearsals/:id/tasks/reorder", put(rehearsals::reorder_tasks))
        .route(
            "/rehearsals/:id/tasks/:task_id",
            post(rehearsals::add_task).delete(rehearsals::remove_task),
        )
}
