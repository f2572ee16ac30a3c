//! Task registry
//!
//! A task owns its uploaded recording. Every path that removes a task or
//! replaces its recording also deletes the file, and every failed write
//! deletes the file it had just stored.

use chorus_common::models::{ResolvedTask, Task, TaskPatch, TaskType};
use chorus_common::time::{now, parse_date};
use chorus_common::{uuid_utils, Error, Result};
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db;
use crate::services::resolve::resolve_tasks;
use crate::uploads::{RecordingStore, StoredRecording, Upload};

/// Task fields as received from a multipart form
///
/// Everything is optional here; `create` enforces what is required.
#[derive(Debug, Clone, Default)]
pub struct TaskForm {
    pub task_type: Option<String>,
    pub song: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub completed: Option<String>,
    pub recording: Option<Upload>,
}

/// List all tasks by date with their songs
pub async fn list(pool: &SqlitePool) -> Result<Vec<ResolvedTask>> {
    let tasks = db::tasks::list_tasks(pool).await?;
    resolve_tasks(pool, tasks).await
}

/// Create a task, storing its recording first when one was uploaded
///
/// After the insert the song reference is resolved again; if the song
/// disappeared in between, the task and the file are removed and the
/// request fails with a validation error.
pub async fn create(
    pool: &SqlitePool,
    store: &RecordingStore,
    form: TaskForm,
) -> Result<ResolvedTask> {
    let song_ref = non_blank(form.song.as_deref())
        .ok_or_else(|| Error::Validation("A song reference is required".to_string()))?;
    let song = parse_song_ref(song_ref)?;
    let task_type: TaskType = non_blank(form.task_type.as_deref())
        .ok_or_else(|| Error::Validation("Path `taskType` is required.".to_string()))?
        .parse()?;
    let date = parse_date(
        non_blank(form.date.as_deref())
            .ok_or_else(|| Error::Validation("Path `date` is required.".to_string()))?,
    )?;
    let completed = form
        .completed
        .as_deref()
        .map(parse_flag)
        .transpose()?
        .unwrap_or(false);

    ensure_song_exists(pool, song).await?;

    let stored = match &form.recording {
        Some(upload) => Some(store.save(upload).await?),
        None => None,
    };

    let created_at = now();
    let task = Task {
        id: uuid_utils::generate(),
        task_type,
        song,
        recording: stored.as_ref().map(|s| s.public_path.clone()),
        description: form.description.and_then(description_value),
        date,
        completed,
        created_at,
        updated_at: created_at,
    };

    match insert_and_resolve(pool, task).await {
        Ok(resolved) => {
            info!("Created {} task {} for song {}", resolved.task_type, resolved.id, song);
            Ok(resolved)
        }
        Err(e) => {
            if let Some(stored) = &stored {
                store.discard(&stored.public_path).await;
            }
            Err(e)
        }
    }
}

async fn insert_and_resolve(pool: &SqlitePool, task: Task) -> Result<ResolvedTask> {
    db::tasks::insert_task(pool, &task).await?;

    match db::songs::load_song(pool, task.song).await {
        Ok(Some(song)) => Ok(ResolvedTask::new(task, Some(song))),
        Ok(None) => {
            warn!(
                "Song {} disappeared while creating task {}; rolling back",
                task.song, task.id
            );
            db::tasks::delete_task(pool, task.id).await?;
            Err(Error::Validation("Invalid song reference".to_string()))
        }
        Err(e) => {
            if let Err(rollback) = db::tasks::delete_task(pool, task.id).await {
                error!("Failed to roll back task {}: {}", task.id, rollback);
            }
            Err(e)
        }
    }
}

/// Update a task; a new upload replaces (and deletes) the previous recording
pub async fn update(
    pool: &SqlitePool,
    store: &RecordingStore,
    id: &str,
    form: TaskForm,
) -> Result<ResolvedTask> {
    let id = uuid_utils::parse_id(id, "Task")?;
    let existing = db::tasks::load_task(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound("Task not found".to_string()))?;

    let patch = TaskPatch {
        task_type: non_blank(form.task_type.as_deref())
            .map(str::parse::<TaskType>)
            .transpose()?,
        song: non_blank(form.song.as_deref()).map(parse_song_ref).transpose()?,
        recording: None,
        // A blank description field clears the stored one
        description: form.description.map(description_value),
        date: non_blank(form.date.as_deref()).map(parse_date).transpose()?,
        completed: form.completed.as_deref().map(parse_flag).transpose()?,
    };
    if let Some(song) = patch.song {
        ensure_song_exists(pool, song).await?;
    }

    store_and_apply(pool, store, &existing, patch, form.recording.as_ref()).await
}

/// Store the new upload, then write the patch; the new file is discarded
/// when the write fails
async fn store_and_apply(
    pool: &SqlitePool,
    store: &RecordingStore,
    existing: &Task,
    mut patch: TaskPatch,
    upload: Option<&Upload>,
) -> Result<ResolvedTask> {
    let stored = match upload {
        Some(upload) => Some(store.save(upload).await?),
        None => None,
    };
    if let Some(stored) = &stored {
        patch.recording = Some(stored.public_path.clone());
    }

    let result = apply_update(pool, store, existing, &patch, stored.as_ref()).await;
    if result.is_err() {
        if let Some(stored) = &stored {
            store.discard(&stored.public_path).await;
        }
    }
    result
}

async fn apply_update(
    pool: &SqlitePool,
    store: &RecordingStore,
    existing: &Task,
    patch: &TaskPatch,
    replacement: Option<&StoredRecording>,
) -> Result<ResolvedTask> {
    if let (Some(replacement), Some(previous)) = (replacement, &existing.recording) {
        // A previous file that is already gone is fine
        match store.remove(previous).await {
            Ok(_) => info!(
                "Replaced recording of task {}: {} -> {}",
                existing.id, previous, replacement.public_path
            ),
            Err(e) => warn!("Failed to delete old recording {}: {}", previous, e),
        }
    }

    let task = db::tasks::update_task(pool, existing.id, patch)
        .await?
        .ok_or_else(|| Error::NotFound("Task not found".to_string()))?;
    let song = db::songs::load_song(pool, task.song).await?;
    Ok(ResolvedTask::new(task, song))
}

/// Delete a task and its recording
pub async fn delete(pool: &SqlitePool, store: &RecordingStore, id: &str) -> Result<()> {
    let id = uuid_utils::parse_id(id, "Task")?;
    let task = db::tasks::load_task(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound("Task not found".to_string()))?;

    remove_task(pool, store, &task).await?;
    Ok(())
}

/// Delete the recording (best effort), then the record
///
/// Returns false when the record was already gone.
pub(crate) async fn remove_task(
    pool: &SqlitePool,
    store: &RecordingStore,
    task: &Task,
) -> Result<bool> {
    if let Some(recording) = &task.recording {
        store.discard(recording).await;
    }
    let deleted = db::tasks::delete_task(pool, task.id).await?;
    if deleted {
        info!("Deleted task {}", task.id);
    }
    Ok(deleted)
}

async fn ensure_song_exists(pool: &SqlitePool, song: Uuid) -> Result<()> {
    if db::songs::load_song(pool, song).await?.is_none() {
        return Err(Error::Validation("Referenced song does not exist".to_string()));
    }
    Ok(())
}

fn parse_song_ref(value: &str) -> Result<Uuid> {
    uuid_utils::parse(value.trim())
        .map_err(|_| Error::Validation("Invalid song reference".to_string()))
}

fn description_value(value: String) -> Option<String> {
    Some(value).filter(|d| !d.trim().is_empty())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Form checkbox values
fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Ok(true),
        "false" | "off" | "0" | "no" | "" => Ok(false),
        other => Err(Error::Validation(format!("`{}` is not a valid boolean", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use axum::body::Bytes;
    use chorus_common::models::NewSong;
    use tempfile::TempDir;

    async fn song(pool: &SqlitePool) -> Uuid {
        db::songs::insert_song(
            pool,
            &NewSong {
                title: "Ave Verum".into(),
                soloist: "Dana".into(),
                conductor: "Eli".into(),
                vp: "Fay".into(),
            },
        )
        .await
        .unwrap()
        .id
    }

    fn form(song: Uuid) -> TaskForm {
        TaskForm {
            task_type: Some("learn".into()),
            song: Some(song.to_string()),
            date: Some("2025-06-10T18:00:00Z".into()),
            ..Default::default()
        }
    }

    fn recording(name: &str) -> Upload {
        Upload {
            original_name: Some(name.into()),
            bytes: Bytes::from_static(b"RIFF....WAVE"),
        }
    }

    fn file_count(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_create_with_recording() {
        let (_db, pool) = test_pool().await;
        let uploads = TempDir::new().unwrap();
        let store = RecordingStore::new(uploads.path());
        let song_id = song(&pool).await;

        let mut f = form(song_id);
        f.recording = Some(recording("take.wav"));
        let task = create(&pool, &store, f).await.unwrap();

        assert_eq!(task.song.as_ref().map(|s| s.id), Some(song_id));
        assert!(!task.completed);
        let path = store.resolve(task.recording.as_deref().unwrap()).unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_create_requires_song() {
        let (_db, pool) = test_pool().await;
        let uploads = TempDir::new().unwrap();
        let store = RecordingStore::new(uploads.path());

        let mut f = form(Uuid::new_v4());
        f.song = None;
        f.recording = Some(recording("take.wav"));
        let err = create(&pool, &store, f).await.unwrap_err();

        assert!(matches!(err, Error::Validation(ref m) if m == "A song reference is required"));
        assert_eq!(file_count(&uploads), 0);
    }

    #[tokio::test]
    async fn test_create_with_unknown_song_stores_nothing() {
        let (_db, pool) = test_pool().await;
        let uploads = TempDir::new().unwrap();
        let store = RecordingStore::new(uploads.path());

        let mut f = form(Uuid::new_v4());
        f.recording = Some(recording("take.wav"));
        let err = create(&pool, &store, f).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(file_count(&uploads), 0);
        assert!(db::tasks::list_tasks(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_rolls_back_when_song_is_gone() {
        let (_db, pool) = test_pool().await;
        let created_at = now();
        let task = Task {
            id: uuid_utils::generate(),
            task_type: TaskType::Learn,
            song: Uuid::new_v4(),
            recording: None,
            description: None,
            date: created_at,
            completed: false,
            created_at,
            updated_at: created_at,
        };

        let err = insert_and_resolve(&pool, task.clone()).await.unwrap_err();

        assert!(matches!(err, Error::Validation(ref m) if m == "Invalid song reference"));
        assert!(db::tasks::load_task(&pool, task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_update_discards_new_recording() {
        let (_db, pool) = test_pool().await;
        let uploads = TempDir::new().unwrap();
        let store = RecordingStore::new(uploads.path());
        let song_id = song(&pool).await;
        let task = create(&pool, &store, form(song_id)).await.unwrap();
        let existing = db::tasks::load_task(&pool, task.id).await.unwrap().unwrap();

        // The record disappears after it was loaded but before the write
        db::tasks::delete_task(&pool, task.id).await.unwrap();
        let upload = recording("late.wav");

        let err = store_and_apply(&pool, &store, &existing, TaskPatch::default(), Some(&upload))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(file_count(&uploads), 0);
    }

    #[tokio::test]
    async fn test_update_with_recording_for_missing_task_stores_nothing() {
        let (_db, pool) = test_pool().await;
        let uploads = TempDir::new().unwrap();
        let store = RecordingStore::new(uploads.path());

        let update_form = TaskForm {
            recording: Some(recording("orphan.wav")),
            ..Default::default()
        };
        let err = update(&pool, &store, &Uuid::new_v4().to_string(), update_form)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(file_count(&uploads), 0);
    }

    #[tokio::test]
    async fn test_blank_description_is_cleared_on_update() {
        let (_db, pool) = test_pool().await;
        let uploads = TempDir::new().unwrap();
        let store = RecordingStore::new(uploads.path());
        let song_id = song(&pool).await;

        let mut f = form(song_id);
        f.description = Some("   ".into());
        let task = create(&pool, &store, f).await.unwrap();
        assert_eq!(task.description, None);

        let set = TaskForm {
            description: Some("altos only".into()),
            ..Default::default()
        };
        let task = update(&pool, &store, &task.id.to_string(), set).await.unwrap();
        assert_eq!(task.description.as_deref(), Some("altos only"));

        let blank = TaskForm {
            description: Some(String::new()),
            ..Default::default()
        };
        let task = update(&pool, &store, &task.id.to_string(), blank).await.unwrap();
        assert_eq!(task.description, None);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_task_type() {
        let (_db, pool) = test_pool().await;
        let uploads = TempDir::new().unwrap();
        let store = RecordingStore::new(uploads.path());
        let song_id = song(&pool).await;

        let mut f = form(song_id);
        f.task_type = Some("karaoke".into());
        assert!(matches!(
            create(&pool, &store, f).await.unwrap_err(),
            Error::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_update_replaces_recording() {
        let (_db, pool) = test_pool().await;
        let uploads = TempDir::new().unwrap();
        let store = RecordingStore::new(uploads.path());
        let song_id = song(&pool).await;

        let mut f = form(song_id);
        f.recording = Some(recording("first.wav"));
        let task = create(&pool, &store, f).await.unwrap();
        let first = store.resolve(task.recording.as_deref().unwrap()).unwrap();

        let update_form = TaskForm {
            completed: Some("true".into()),
            recording: Some(recording("second.mp3")),
            ..Default::default()
        };
        let updated = update(&pool, &store, &task.id.to_string(), update_form)
            .await
            .unwrap();

        assert!(updated.completed);
        assert!(!first.exists(), "old recording should be deleted");
        let second = store.resolve(updated.recording.as_deref().unwrap()).unwrap();
        assert!(second.exists());
        assert_eq!(file_count(&uploads), 1);
    }

    #[tokio::test]
    async fn test_update_missing_task() {
        let (_db, pool) = test_pool().await;
        let uploads = TempDir::new().unwrap();
        let store = RecordingStore::new(uploads.path());

        let err = update(&pool, &store, &Uuid::new_v4().to_string(), TaskForm::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = update(&pool, &store, "bogus", TaskForm::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidId(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_recording() {
        let (_db, pool) = test_pool().await;
        let uploads = TempDir::new().unwrap();
        let store = RecordingStore::new(uploads.path());
        let song_id = song(&pool).await;

        let mut f = form(song_id);
        f.recording = Some(recording("take.wav"));
        let task = create(&pool, &store, f).await.unwrap();
        let path = store.resolve(task.recording.as_deref().unwrap()).unwrap();

        delete(&pool, &store, &task.id.to_string()).await.unwrap();

        assert!(!path.exists());
        assert!(db::tasks::load_task(&pool, task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_file() {
        let (_db, pool) = test_pool().await;
        let uploads = TempDir::new().unwrap();
        let store = RecordingStore::new(uploads.path());
        let song_id = song(&pool).await;

        let mut f = form(song_id);
        f.recording = Some(recording("take.wav"));
        let task = create(&pool, &store, f).await.unwrap();
        std::fs::remove_file(store.resolve(task.recording.as_deref().unwrap()).unwrap()).unwrap();

        delete(&pool, &store, &task.id.to_string()).await.unwrap();
        assert!(db::tasks::load_task(&pool, task.id).await.unwrap().is_none());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true").unwrap());
        assert!(parse_flag("on").unwrap());
        assert!(!parse_flag("false").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
