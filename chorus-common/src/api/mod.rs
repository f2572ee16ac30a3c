//! Shared HTTP API types
//!
//! Framework-free: the server crate wraps these in axum responses.

pub mod types;

pub use types::ApiResponse;
