//! chorus-server library - choir rehearsal planner backend
//!
//! Exposes the router and state for the binary and for integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;
pub mod uploads;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use chorus_common::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::uploads::RecordingStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Uploaded recordings on disk
    pub recordings: RecordingStore,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, recordings: RecordingStore) -> Self {
        Self {
            db,
            recordings,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// `/api/*` carries the JSON API, `/uploads/*` serves stored recordings and
/// `/health` reports liveness.
pub fn build_router(state: AppState, config: &ServerConfig) -> Result<Router> {
    let origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        Error::Config(format!(
            "Invalid allowed origin '{}': {}",
            config.allowed_origin, e
        ))
    })?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let uploads = ServeDir::new(state.recordings.dir());

    Ok(Router::new()
        .nest("/api", api::api_routes())
        .merge(api::health_routes())
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
