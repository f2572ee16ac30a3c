//! Task database operations

use chorus_common::models::{Task, TaskPatch, TaskType};
use chorus_common::time::{from_db_string, now, to_db_string};
use chorus_common::{uuid_utils, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

const TASK_COLUMNS: &str =
    "guid, task_type, song_guid, recording, description, date, completed, created_at, updated_at";

fn task_from_row(row: &SqliteRow) -> Result<Task> {
    let guid: String = row.get("guid");
    let song_guid: String = row.get("song_guid");
    let task_type: String = row.get("task_type");
    let date: String = row.get("date");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Task {
        id: uuid_utils::parse(&guid)
            .map_err(|e| Error::Internal(format!("Corrupt task guid '{}': {}", guid, e)))?,
        task_type: task_type
            .parse::<TaskType>()
            .map_err(|e| Error::Internal(format!("Corrupt task type on {}: {}", guid, e)))?,
        song: uuid_utils::parse(&song_guid)
            .map_err(|e| Error::Internal(format!("Corrupt song reference on {}: {}", guid, e)))?,
        recording: row.get("recording"),
        description: row.get("description"),
        date: from_db_string(&date)?,
        completed: row.get::<i64, _>("completed") != 0,
        created_at: from_db_string(&created_at)?,
        updated_at: from_db_string(&updated_at)?,
    })
}

/// Load all tasks ordered by date
pub async fn list_tasks(pool: &SqlitePool) -> Result<Vec<Task>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tasks ORDER BY date ASC, created_at ASC",
        TASK_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(task_from_row).collect()
}

/// Load task by guid
pub async fn load_task(pool: &SqlitePool, id: Uuid) -> Result<Option<Task>> {
    let row = sqlx::query(&format!("SELECT {} FROM tasks WHERE guid = ?", TASK_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(task_from_row).transpose()
}

/// Load the tasks that exist among `ids`, keyed by guid
pub async fn load_tasks_by_ids(pool: &SqlitePool, ids: &[Uuid]) -> Result<HashMap<Uuid, Task>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM tasks WHERE guid IN (", TASK_COLUMNS));
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id.to_string());
    }
    separated.push_unseparated(")");

    let rows = query.build().fetch_all(pool).await?;
    rows.iter()
        .map(|row| task_from_row(row).map(|task| (task.id, task)))
        .collect()
}

/// Insert a fully-formed task
pub async fn insert_task(pool: &SqlitePool, task: &Task) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tasks (
            guid, task_type, song_guid, recording, description, date, completed,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(task.id.to_string())
    .bind(task.task_type.as_str())
    .bind(task.song.to_string())
    .bind(&task.recording)
    .bind(&task.description)
    .bind(to_db_string(task.date))
    .bind(task.completed as i64)
    .bind(to_db_string(task.created_at))
    .bind(to_db_string(task.updated_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Apply a partial update; returns `None` when the task does not exist
pub async fn update_task(pool: &SqlitePool, id: Uuid, patch: &TaskPatch) -> Result<Option<Task>> {
    let result = sqlx::query(
        r#"
        UPDATE tasks SET
            task_type = COALESCE(?, task_type),
            song_guid = COALESCE(?, song_guid),
            recording = COALESCE(?, recording),
            description = CASE WHEN ? THEN ? ELSE description END,
            date = COALESCE(?, date),
            completed = COALESCE(?, completed),
            updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(patch.task_type.map(|t| t.as_str()))
    .bind(patch.song.map(|id| id.to_string()))
    .bind(&patch.recording)
    .bind(patch.description.is_some())
    .bind(patch.description.as_ref().and_then(|d| d.as_deref()))
    .bind(patch.date.map(to_db_string))
    .bind(patch.completed.map(|c| c as i64))
    .bind(to_db_string(now()))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    load_task(pool, id).await
}

/// Delete task by guid; returns false when nothing was deleted
pub async fn delete_task(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM tasks WHERE guid = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Tasks whose song reference does not resolve to an existing song
pub async fn list_orphaned_tasks(pool: &SqlitePool) -> Result<Vec<Task>> {
    let rows = sqlx::query(
        r#"
        SELECT t.guid, t.task_type, t.song_guid, t.recording, t.description, t.date,
               t.completed, t.created_at, t.updated_at
        FROM tasks t
        LEFT JOIN songs s ON s.guid = t.song_guid
        WHERE s.guid IS NULL
        ORDER BY t.date ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(task_from_row).collect()
}
