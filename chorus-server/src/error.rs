//! HTTP error mapping for chorus-server

use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chorus_common::api::types::ApiResponse;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request body (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Registry or coordinator error
    #[error(transparent)]
    Common(#[from] chorus_common::Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use chorus_common::Error;

        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Common(err) => match err {
                Error::Validation(_) => StatusCode::BAD_REQUEST,
                Error::InvalidId(_) | Error::NotFound(_) => StatusCode::NOT_FOUND,
                Error::Duplicate(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Common(err) if err.is_client_error() => err.to_string(),
            ApiError::Common(err @ chorus_common::Error::BatchFailed { .. }) => {
                error!("{}", err);
                format!("Server Error: {}", err)
            }
            ApiError::Common(err) => {
                error!("Request failed: {}", err);
                "Server Error".to_string()
            }
        };

        (status, Json(ApiResponse::<()>::failure(message))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
