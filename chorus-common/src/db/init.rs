//! Database initialization
//!
//! Opens (creating if needed) the SQLite store and creates the three
//! collections. Table creation is idempotent, so every start runs it.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Time allowed to establish a connection before startup fails
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle connections are closed after this long
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(45);

/// How long a writer waits on a locked database
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// True for `sqlite::memory:`, `sqlite://:memory:` and `mode=memory` URLs
///
/// Checked on the URL itself: sqlx rewrites in-memory filenames internally.
pub fn is_in_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Initialize database connection and create tables if needed
pub async fn init_database(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let db_path = options.get_filename().to_path_buf();
    let in_memory = is_in_memory_url(database_url) || db_path.as_os_str().is_empty();

    // Create parent directory if it doesn't exist
    if !in_memory {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }
    let newly_created = !in_memory && !db_path.exists();

    // An in-memory database lives exactly as long as its one connection
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
            .max_connections(10)
            .idle_timeout(IDLE_TIMEOUT)
    };
    let pool = pool_options
        .acquire_timeout(CONNECT_TIMEOUT)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_songs_table(&pool).await?;
    create_tasks_table(&pool).await?;
    create_rehearsals_table(&pool).await?;

    Ok(pool)
}

/// Create the songs table
///
/// `sort_order` backs the `order` field (ORDER is reserved in SQL).
pub async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            soloist TEXT NOT NULL,
            conductor TEXT NOT NULL,
            vp TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_songs_sort_order ON songs(sort_order)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the tasks table
///
/// `song_guid` has no foreign key: deleting a song leaves its tasks behind
/// for the invalid-task cleanup to find.
pub async fn create_tasks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            guid TEXT PRIMARY KEY,
            task_type TEXT NOT NULL,
            song_guid TEXT NOT NULL,
            recording TEXT,
            description TEXT,
            date TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_date ON tasks(date)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the rehearsals table
///
/// `task_ids` is a JSON array of task guids in display order. The unique
/// index on the normalized date backs the one-rehearsal-per-day rule.
pub async fn create_rehearsals_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rehearsals (
            guid TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            task_ids TEXT NOT NULL DEFAULT '[]',
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_rehearsals_date ON rehearsals(date)")
        .execute(pool)
        .await?;

    Ok(())
}
