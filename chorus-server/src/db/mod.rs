//! Storage-backed repositories, one module per collection
//!
//! Every function takes the pool explicitly; no collection state is held in
//! process memory.

pub mod rehearsals;
pub mod songs;
pub mod tasks;

pub use chorus_common::db::init_database;

/// Fresh database in a temporary directory; keep the guard alive for the test
#[cfg(test)]
pub(crate) async fn test_pool() -> (tempfile::TempDir, sqlx::SqlitePool) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("test.db").display());
    let pool = init_database(&url)
        .await
        .expect("Failed to initialize test database");
    (dir, pool)
}
