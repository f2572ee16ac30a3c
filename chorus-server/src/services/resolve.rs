//! Reference resolution
//!
//! Builds the resolved views returned to clients: rehearsal → tasks → song.
//! Each level is fetched with one `IN (...)` query.

use chorus_common::models::{Rehearsal, ResolvedRehearsal, ResolvedTask, Task};
use chorus_common::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db;

/// Attach songs to tasks, keeping task order
///
/// A task whose song is gone is kept with `song: None`.
pub async fn resolve_tasks(pool: &SqlitePool, tasks: Vec<Task>) -> Result<Vec<ResolvedTask>> {
    let song_ids = distinct(tasks.iter().map(|t| t.song));
    let songs = db::songs::load_songs_by_ids(pool, &song_ids).await?;

    Ok(tasks
        .into_iter()
        .map(|task| {
            let song = songs.get(&task.song).cloned();
            ResolvedTask::new(task, song)
        })
        .collect())
}

/// Resolve a batch of rehearsals, keeping rehearsal and task order
///
/// Task ids that no longer point at a task are left out of the view.
pub async fn resolve_rehearsals(
    pool: &SqlitePool,
    rehearsals: Vec<Rehearsal>,
) -> Result<Vec<ResolvedRehearsal>> {
    let task_ids = distinct(rehearsals.iter().flat_map(|r| r.task_ids.iter().copied()));
    let tasks = db::tasks::load_tasks_by_ids(pool, &task_ids).await?;
    let resolved = resolve_tasks(pool, tasks.into_values().collect()).await?;
    let by_id: HashMap<Uuid, ResolvedTask> = resolved.into_iter().map(|t| (t.id, t)).collect();

    Ok(rehearsals
        .into_iter()
        .map(|rehearsal| {
            let tasks = rehearsal
                .task_ids
                .iter()
                .filter_map(|id| by_id.get(id).cloned())
                .collect();
            ResolvedRehearsal::new(rehearsal, tasks)
        })
        .collect())
}

/// Resolve a single rehearsal
pub async fn resolve_rehearsal(pool: &SqlitePool, rehearsal: Rehearsal) -> Result<ResolvedRehearsal> {
    let mut resolved = resolve_rehearsals(pool, vec![rehearsal]).await?;
    Ok(resolved.remove(0))
}

fn distinct(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_removes_duplicates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ids = distinct([a, b, a, a].into_iter());
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a) && ids.contains(&b));
    }
}
