//! Song database operations

use chorus_common::models::{NewSong, Song, SongPatch};
use chorus_common::time::{from_db_string, now, to_db_string};
use chorus_common::{uuid_utils, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

const SONG_COLUMNS: &str =
    "guid, title, soloist, conductor, vp, sort_order, created_at, updated_at";

fn song_from_row(row: &SqliteRow) -> Result<Song> {
    let guid: String = row.get("guid");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Song {
        id: uuid_utils::parse(&guid)
            .map_err(|e| Error::Internal(format!("Corrupt song guid '{}': {}", guid, e)))?,
        title: row.get("title"),
        soloist: row.get("soloist"),
        conductor: row.get("conductor"),
        vp: row.get("vp"),
        order: row.get("sort_order"),
        created_at: from_db_string(&created_at)?,
        updated_at: from_db_string(&updated_at)?,
    })
}

/// Load all songs in display order
pub async fn list_songs(pool: &SqlitePool) -> Result<Vec<Song>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM songs ORDER BY sort_order ASC, created_at ASC",
        SONG_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(song_from_row).collect()
}

/// Load song by guid
pub async fn load_song(pool: &SqlitePool, id: Uuid) -> Result<Option<Song>> {
    let row = sqlx::query(&format!("SELECT {} FROM songs WHERE guid = ?", SONG_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(song_from_row).transpose()
}

/// Load the songs that exist among `ids`, keyed by guid
pub async fn load_songs_by_ids(pool: &SqlitePool, ids: &[Uuid]) -> Result<HashMap<Uuid, Song>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM songs WHERE guid IN (", SONG_COLUMNS));
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id.to_string());
    }
    separated.push_unseparated(")");

    let rows = query.build().fetch_all(pool).await?;
    rows.iter()
        .map(|row| song_from_row(row).map(|song| (song.id, song)))
        .collect()
}

/// Insert a song at the end of the display order
///
/// The next order value is computed inside the INSERT so two concurrent
/// creates cannot read the same maximum.
pub async fn insert_song(pool: &SqlitePool, song: &NewSong) -> Result<Song> {
    let id = uuid_utils::generate();
    let timestamp = to_db_string(now());

    sqlx::query(
        r#"
        INSERT INTO songs (guid, title, soloist, conductor, vp, sort_order, created_at, updated_at)
        SELECT ?, ?, ?, ?, ?, COALESCE(MAX(sort_order) + 1, 0), ?, ?
        FROM songs
        "#,
    )
    .bind(id.to_string())
    .bind(&song.title)
    .bind(&song.soloist)
    .bind(&song.conductor)
    .bind(&song.vp)
    .bind(&timestamp)
    .bind(&timestamp)
    .execute(pool)
    .await?;

    load_song(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Song {} vanished after insert", id)))
}

/// Apply a partial update; returns `None` when the song does not exist
///
/// The display position is not part of a patch; only reorder changes it.
pub async fn update_song(pool: &SqlitePool, id: Uuid, patch: &SongPatch) -> Result<Option<Song>> {
    let result = sqlx::query(
        r#"
        UPDATE songs SET
            title = COALESCE(?, title),
            soloist = COALESCE(?, soloist),
            conductor = COALESCE(?, conductor),
            vp = COALESCE(?, vp),
            updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&patch.title)
    .bind(&patch.soloist)
    .bind(&patch.conductor)
    .bind(&patch.vp)
    .bind(to_db_string(now()))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    load_song(pool, id).await
}

/// Set one song's display position; returns false when the song does not exist
pub async fn set_song_order(pool: &SqlitePool, id: Uuid, order: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE songs SET sort_order = ?, updated_at = ? WHERE guid = ?")
        .bind(order)
        .bind(to_db_string(now()))
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete song by guid; returns false when nothing was deleted
pub async fn delete_song(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM songs WHERE guid = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
