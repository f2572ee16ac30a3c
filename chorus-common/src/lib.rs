//! # Chorus Common Library
//!
//! Shared code for the Chorus rehearsal planner including:
//! - Error type shared by repositories and services
//! - Song, task and rehearsal models
//! - API response envelope
//! - Database bootstrap
//! - Configuration file resolution
//! - Id and date utilities

pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod models;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use models::{Rehearsal, ResolvedRehearsal, ResolvedTask, Song, Task, TaskType};
