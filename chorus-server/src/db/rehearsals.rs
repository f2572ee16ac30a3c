//! Rehearsal database operations
//!
//! The task list is stored as a JSON array of guids and always written as a
//! whole, so a single UPDATE replaces it atomically.

use chorus_common::models::Rehearsal;
use chorus_common::time::{from_db_string, now, to_db_string};
use chorus_common::{uuid_utils, Error, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const REHEARSAL_COLUMNS: &str = "guid, date, task_ids, notes, created_at, updated_at";

fn encode_task_ids(ids: &[Uuid]) -> Result<String> {
    serde_json::to_string(ids)
        .map_err(|e| Error::Internal(format!("Failed to serialize task ids: {}", e)))
}

fn rehearsal_from_row(row: &SqliteRow) -> Result<Rehearsal> {
    let guid: String = row.get("guid");
    let date: String = row.get("date");
    let task_ids: String = row.get("task_ids");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Rehearsal {
        id: uuid_utils::parse(&guid)
            .map_err(|e| Error::Internal(format!("Corrupt rehearsal guid '{}': {}", guid, e)))?,
        date: from_db_string(&date)?,
        task_ids: serde_json::from_str(&task_ids).map_err(|e| {
            Error::Internal(format!("Failed to deserialize task ids of {}: {}", guid, e))
        })?,
        notes: row.get("notes"),
        created_at: from_db_string(&created_at)?,
        updated_at: from_db_string(&updated_at)?,
    })
}

/// Load all rehearsals ordered by date
pub async fn list_rehearsals(pool: &SqlitePool) -> Result<Vec<Rehearsal>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM rehearsals ORDER BY date ASC",
        REHEARSAL_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(rehearsal_from_row).collect()
}

/// Load rehearsals with `from <= date < to`, ordered by date; a missing bound is open
pub async fn list_rehearsals_between(
    pool: &SqlitePool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<Rehearsal>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM rehearsals
         WHERE (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date < ?2)
         ORDER BY date ASC",
        REHEARSAL_COLUMNS
    ))
    .bind(from.map(to_db_string))
    .bind(to.map(to_db_string))
    .fetch_all(pool)
    .await?;

    rows.iter().map(rehearsal_from_row).collect()
}

/// Load rehearsal by guid
pub async fn load_rehearsal(pool: &SqlitePool, id: Uuid) -> Result<Option<Rehearsal>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM rehearsals WHERE guid = ?",
        REHEARSAL_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(rehearsal_from_row).transpose()
}

/// First rehearsal dated within `[start, end)`
pub async fn find_rehearsal_in_window(
    pool: &SqlitePool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Option<Rehearsal>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM rehearsals WHERE date >= ? AND date < ? LIMIT 1",
        REHEARSAL_COLUMNS
    ))
    .bind(to_db_string(start))
    .bind(to_db_string(end))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(rehearsal_from_row).transpose()
}

/// Insert a new rehearsal
pub async fn insert_rehearsal(pool: &SqlitePool, rehearsal: &Rehearsal) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rehearsals (guid, date, task_ids, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(rehearsal.id.to_string())
    .bind(to_db_string(rehearsal.date))
    .bind(encode_task_ids(&rehearsal.task_ids)?)
    .bind(&rehearsal.notes)
    .bind(to_db_string(rehearsal.created_at))
    .bind(to_db_string(rehearsal.updated_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Overwrite date, task list and notes; returns false when the rehearsal does not exist
pub async fn save_rehearsal(pool: &SqlitePool, rehearsal: &Rehearsal) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE rehearsals SET date = ?, task_ids = ?, notes = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(to_db_string(rehearsal.date))
    .bind(encode_task_ids(&rehearsal.task_ids)?)
    .bind(&rehearsal.notes)
    .bind(to_db_string(now()))
    .bind(rehearsal.id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Replace the task list; returns false when the rehearsal does not exist
pub async fn set_task_ids(pool: &SqlitePool, id: Uuid, task_ids: &[Uuid]) -> Result<bool> {
    let result = sqlx::query("UPDATE rehearsals SET task_ids = ?, updated_at = ? WHERE guid = ?")
        .bind(encode_task_ids(task_ids)?)
        .bind(to_db_string(now()))
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete rehearsal by guid; returns false when nothing was deleted
pub async fn delete_rehearsal(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM rehearsals WHERE guid = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete every rehearsal whose stored task list is empty
pub async fn delete_rehearsals_without_task_ids(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM rehearsals WHERE json_array_length(task_ids) = 0")
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
