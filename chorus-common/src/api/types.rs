//! Shared API request/response types
//!
//! Every response carries the same envelope:
//! `{"success": bool, "data"?: ..., "message"?: "..."}`

use serde::{Deserialize, Serialize};

/// Response envelope
///
/// # Examples
///
/// ```
/// use chorus_common::api::types::ApiResponse;
///
/// let ok = ApiResponse::data(vec![1, 2, 3]);
/// assert!(ok.success);
///
/// let err = ApiResponse::<()>::failure("Song not found");
/// assert!(!err.success);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying a payload
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    /// Failed response carrying a human-readable message
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    /// Successful response with only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}
