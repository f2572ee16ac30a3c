//! Song registry
//!
//! Songs are kept in an explicit display order. New songs go to the end;
//! reorder rewrites every submitted song's position.

use chorus_common::models::{NewSong, Song, SongPatch};
use chorus_common::{uuid_utils, Error, Result};
use futures::future::join_all;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db;

/// List all songs by display order
pub async fn list(pool: &SqlitePool) -> Result<Vec<Song>> {
    db::songs::list_songs(pool).await
}

/// Create a song at the end of the display order
pub async fn create(pool: &SqlitePool, song: NewSong) -> Result<Song> {
    for (field, value) in [
        ("title", &song.title),
        ("soloist", &song.soloist),
        ("conductor", &song.conductor),
        ("vp", &song.vp),
    ] {
        require_non_empty(field, value)?;
    }

    let created = db::songs::insert_song(pool, &song).await?;
    info!("Created song '{}' at position {}", created.title, created.order);
    Ok(created)
}

/// Partially update a song
pub async fn update(pool: &SqlitePool, id: &str, patch: SongPatch) -> Result<Song> {
    let id = uuid_utils::parse_id(id, "Song")?;

    for (field, value) in [
        ("title", &patch.title),
        ("soloist", &patch.soloist),
        ("conductor", &patch.conductor),
        ("vp", &patch.vp),
    ] {
        if let Some(value) = value {
            require_non_empty(field, value)?;
        }
    }

    db::songs::update_song(pool, id, &patch)
        .await?
        .ok_or_else(|| Error::NotFound("Song not found".to_string()))
}

/// Delete a song
///
/// Tasks pointing at the song are left in place; the invalid-task cleanup
/// removes them.
pub async fn delete(pool: &SqlitePool, id: &str) -> Result<()> {
    let id = uuid_utils::parse_id(id, "Song")?;

    if !db::songs::delete_song(pool, id).await? {
        return Err(Error::NotFound("Song not found".to_string()));
    }
    info!("Deleted song {}", id);
    Ok(())
}

/// Assign `order = index` to each submitted song id
///
/// The updates run concurrently and independently: there is no transaction,
/// so when some fail the others stay applied and a `BatchFailed` error
/// reports how many did not go through. Unknown ids count as failures.
pub async fn reorder(pool: &SqlitePool, ids: &[String]) -> Result<()> {
    let ids = ids
        .iter()
        .map(|id| uuid_utils::parse_id(id, "Song"))
        .collect::<Result<Vec<_>>>()?;

    let updates = ids
        .iter()
        .enumerate()
        .map(|(index, id)| db::songs::set_song_order(pool, *id, index as i64));
    let results = join_all(updates).await;

    let mut failed = 0;
    for (id, result) in ids.iter().zip(results) {
        match result {
            Ok(true) => {}
            Ok(false) => {
                warn!("Reorder skipped unknown song {}", id);
                failed += 1;
            }
            Err(e) => {
                warn!("Failed to reorder song {}: {}", id, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(Error::BatchFailed {
            failed,
            total: ids.len(),
        });
    }

    info!("Reordered {} songs", ids.len());
    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("Path `{}` is required.", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn new_song(title: &str) -> NewSong {
        NewSong {
            title: title.to_string(),
            soloist: "Soloist".to_string(),
            conductor: "Conductor".to_string(),
            vp: "VP".to_string(),
        }
    }

    #[tokio::test]
    async fn test_reorder_two_songs() {
        let (_dir, pool) = test_pool().await;
        let a = create(&pool, new_song("A")).await.unwrap();
        let b = create(&pool, new_song("B")).await.unwrap();
        assert_eq!((a.order, b.order), (0, 1));

        reorder(&pool, &[b.id.to_string(), a.id.to_string()]).await.unwrap();

        let songs = list(&pool).await.unwrap();
        assert_eq!(songs[0].id, b.id);
        assert_eq!(songs[0].order, 0);
        assert_eq!(songs[1].id, a.id);
        assert_eq!(songs[1].order, 1);
    }

    #[tokio::test]
    async fn test_reorder_assigns_dense_positions() {
        let (_dir, pool) = test_pool().await;
        let mut ids = Vec::new();
        for title in ["A", "B", "C", "D", "E"] {
            ids.push(create(&pool, new_song(title)).await.unwrap().id.to_string());
        }
        ids.reverse();

        reorder(&pool, &ids).await.unwrap();

        let orders: Vec<(String, i64)> = list(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|s| (s.id.to_string(), s.order))
            .collect();
        let expected: Vec<(String, i64)> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i as i64))
            .collect();
        assert_eq!(orders, expected);
    }

    #[tokio::test]
    async fn test_reorder_partial_failure_keeps_applied_updates() {
        let (_dir, pool) = test_pool().await;
        let a = create(&pool, new_song("A")).await.unwrap();
        let b = create(&pool, new_song("B")).await.unwrap();
        let ghost = uuid::Uuid::new_v4().to_string();

        let err = reorder(&pool, &[ghost, b.id.to_string(), a.id.to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BatchFailed { failed: 1, total: 3 }));

        let b = db::songs::load_song(&pool, b.id).await.unwrap().unwrap();
        assert_eq!(b.order, 1);
    }

    #[tokio::test]
    async fn test_update_ignores_order_in_body() {
        let (_dir, pool) = test_pool().await;
        let a = create(&pool, new_song("A")).await.unwrap();
        let b = create(&pool, new_song("B")).await.unwrap();

        let patch: SongPatch =
            serde_json::from_value(serde_json::json!({"title": "A2", "order": b.order})).unwrap();
        let a = update(&pool, &a.id.to_string(), patch).await.unwrap();
        let c = create(&pool, new_song("C")).await.unwrap();

        assert_eq!(a.title, "A2");
        assert_eq!((a.order, b.order, c.order), (0, 1, 2));
    }

    #[tokio::test]
    async fn test_reorder_rejects_malformed_id() {
        let (_dir, pool) = test_pool().await;
        let err = reorder(&pool, &["nope".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidId(_)));
    }

    #[tokio::test]
    async fn test_create_requires_all_fields() {
        let (_dir, pool) = test_pool().await;
        let mut song = new_song("A");
        song.vp = String::new();
        let err = create(&pool, song).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("vp")));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_song() {
        let (_dir, pool) = test_pool().await;
        let id = uuid::Uuid::new_v4().to_string();

        let err = update(&pool, &id, SongPatch::default()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = delete(&pool, &id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = delete(&pool, "bad-id").await.unwrap_err();
        assert!(matches!(err, Error::InvalidId(_)));
    }
}
