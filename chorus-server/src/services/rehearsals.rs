//! Rehearsal registry and the cross-collection coordinator
//!
//! Rules enforced here:
//! - one rehearsal per normalized (midnight UTC) date
//! - a rehearsal's task list is always written as a whole
//! - removing a task from a rehearsal deletes the task, and with it the
//!   recording
//! - cleanups remove rehearsals left without tasks and tasks left without
//!   a song

use chorus_common::models::{
    NewRehearsal, RecordRef, Rehearsal, RehearsalPatch, ResolvedRehearsal, ResolvedTask,
};
use chorus_common::time::{day_window, normalize_date, now, parse_date};
use chorus_common::{uuid_utils, Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db;
use crate::services::resolve::{resolve_rehearsal, resolve_rehearsals};
use crate::services::tasks::remove_task;
use crate::uploads::RecordingStore;

const DUPLICATE_DATE: &str = "A rehearsal already exists for this date";

/// Outcome of the invalid-task cleanup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub tasks_removed: u64,
    pub rehearsals_removed: u64,
}

/// List rehearsals by date, optionally bounded to `[from, to)`
pub async fn list(
    pool: &SqlitePool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<ResolvedRehearsal>> {
    let rehearsals = if from.is_none() && to.is_none() {
        db::rehearsals::list_rehearsals(pool).await?
    } else {
        db::rehearsals::list_rehearsals_between(pool, from, to).await?
    };
    resolve_rehearsals(pool, rehearsals).await
}

/// Create the rehearsal for a calendar day
pub async fn create(pool: &SqlitePool, new: NewRehearsal) -> Result<ResolvedRehearsal> {
    let raw_date = new
        .date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| Error::Validation("Date is required.".to_string()))?;
    let date = normalize_date(parse_date(raw_date)?);

    let (start, end) = day_window(date);
    if db::rehearsals::find_rehearsal_in_window(pool, start, end)
        .await?
        .is_some()
    {
        return Err(Error::Duplicate(DUPLICATE_DATE.to_string()));
    }

    let created_at = now();
    let rehearsal = Rehearsal {
        id: uuid_utils::generate(),
        date,
        task_ids: parse_task_refs(&new.tasks)?,
        notes: new.notes.filter(|n| !n.trim().is_empty()),
        created_at,
        updated_at: created_at,
    };

    // The unique index catches a concurrent create that passed the check
    db::rehearsals::insert_rehearsal(pool, &rehearsal)
        .await
        .map_err(duplicate_on_unique_violation)?;
    info!("Created rehearsal {} on {}", rehearsal.id, date.date_naive());

    resolve_rehearsal(pool, rehearsal).await
}

/// Patch date, task list or notes
pub async fn update(pool: &SqlitePool, id: &str, patch: RehearsalPatch) -> Result<ResolvedRehearsal> {
    let id = uuid_utils::parse_id(id, "Rehearsal")?;
    let mut rehearsal = load_or_not_found(pool, id).await?;

    if let Some(raw_date) = patch.date.as_deref().filter(|d| !d.trim().is_empty()) {
        let date = normalize_date(parse_date(raw_date)?);
        if date != rehearsal.date {
            let (start, end) = day_window(date);
            if let Some(other) = db::rehearsals::find_rehearsal_in_window(pool, start, end).await? {
                if other.id != id {
                    return Err(Error::Duplicate(DUPLICATE_DATE.to_string()));
                }
            }
            rehearsal.date = date;
        }
    }
    if let Some(tasks) = &patch.tasks {
        rehearsal.task_ids = parse_task_refs(tasks)?;
    }
    if let Some(notes) = patch.notes {
        rehearsal.notes = notes.filter(|n| !n.trim().is_empty());
    }

    let saved = db::rehearsals::save_rehearsal(pool, &rehearsal)
        .await
        .map_err(duplicate_on_unique_violation)?;
    if !saved {
        return Err(not_found());
    }

    let rehearsal = load_or_not_found(pool, id).await?;
    resolve_rehearsal(pool, rehearsal).await
}

/// Delete a rehearsal; its tasks are left alone
pub async fn delete(pool: &SqlitePool, id: &str) -> Result<()> {
    let id = uuid_utils::parse_id(id, "Rehearsal")?;
    if !db::rehearsals::delete_rehearsal(pool, id).await? {
        return Err(not_found());
    }
    info!("Deleted rehearsal {}", id);
    Ok(())
}

/// Append a task to the end of a rehearsal's list
///
/// Both records must exist. A task already on the list is not added twice.
pub async fn add_task(
    pool: &SqlitePool,
    rehearsal_id: &str,
    task_id: &str,
) -> Result<ResolvedRehearsal> {
    let rehearsal_id = uuid_utils::parse_id(rehearsal_id, "Rehearsal")?;
    let task_id = uuid_utils::parse_id(task_id, "Task")?;

    let mut rehearsal = load_or_not_found(pool, rehearsal_id).await?;
    if db::tasks::load_task(pool, task_id).await?.is_none() {
        return Err(Error::NotFound("Task not found".to_string()));
    }

    if rehearsal.task_ids.contains(&task_id) {
        debug!("Task {} already on rehearsal {}", task_id, rehearsal_id);
    } else {
        rehearsal.task_ids.push(task_id);
        if !db::rehearsals::set_task_ids(pool, rehearsal_id, &rehearsal.task_ids).await? {
            return Err(not_found());
        }
        info!("Added task {} to rehearsal {}", task_id, rehearsal_id);
    }

    let rehearsal = load_or_not_found(pool, rehearsal_id).await?;
    resolve_rehearsal(pool, rehearsal).await
}

/// Take a task off a rehearsal and delete the task itself
///
/// The task record and its recording are removed globally, not just
/// detached. A task that is already gone only gets its id pulled from the
/// list.
pub async fn detach_and_delete_task(
    pool: &SqlitePool,
    store: &RecordingStore,
    rehearsal_id: &str,
    task_id: &str,
) -> Result<ResolvedRehearsal> {
    let rehearsal_id = uuid_utils::parse_id(rehearsal_id, "Rehearsal")?;
    let task_id = uuid_utils::parse_id(task_id, "Task")?;

    let mut rehearsal = load_or_not_found(pool, rehearsal_id).await?;
    rehearsal.task_ids.retain(|id| *id != task_id);
    if !db::rehearsals::set_task_ids(pool, rehearsal_id, &rehearsal.task_ids).await? {
        return Err(not_found());
    }

    match db::tasks::load_task(pool, task_id).await? {
        Some(task) => {
            remove_task(pool, store, &task).await?;
        }
        None => debug!("Task {} was already deleted", task_id),
    }
    info!("Removed task {} from rehearsal {}", task_id, rehearsal_id);

    let rehearsal = load_or_not_found(pool, rehearsal_id).await?;
    resolve_rehearsal(pool, rehearsal).await
}

/// Replace a rehearsal's task order with the submitted sequence
///
/// The caller is trusted to send the list it last fetched, reordered: the
/// sequence is not checked against the stored set and concurrent reorders
/// resolve as last write wins.
pub async fn reorder_tasks(
    pool: &SqlitePool,
    rehearsal_id: &str,
    tasks: &[RecordRef],
) -> Result<Vec<ResolvedTask>> {
    let rehearsal_id = uuid_utils::parse_id(rehearsal_id, "Rehearsal")?;
    let task_ids = parse_task_refs(tasks)?;

    if !db::rehearsals::set_task_ids(pool, rehearsal_id, &task_ids).await? {
        return Err(not_found());
    }
    info!("Reordered {} tasks on rehearsal {}", task_ids.len(), rehearsal_id);

    let rehearsal = load_or_not_found(pool, rehearsal_id).await?;
    Ok(resolve_rehearsal(pool, rehearsal).await?.tasks)
}

/// Delete rehearsals whose resolved task list is empty
///
/// Ids pointing at deleted tasks do not count as tasks.
pub async fn cleanup_empty_rehearsals(pool: &SqlitePool) -> Result<u64> {
    let rehearsals = db::rehearsals::list_rehearsals(pool).await?;
    let resolved = resolve_rehearsals(pool, rehearsals).await?;

    let mut removed = 0;
    for rehearsal in resolved.iter().filter(|r| r.tasks.is_empty()) {
        if db::rehearsals::delete_rehearsal(pool, rehearsal.id).await? {
            removed += 1;
        }
    }

    info!("Removed {} empty rehearsals", removed);
    Ok(removed)
}

/// Delete tasks whose song no longer exists, then the rehearsals they leave empty
pub async fn cleanup_invalid_tasks(
    pool: &SqlitePool,
    store: &RecordingStore,
) -> Result<CleanupReport> {
    let orphans = db::tasks::list_orphaned_tasks(pool).await?;
    if orphans.is_empty() {
        return Ok(CleanupReport::default());
    }

    let mut report = CleanupReport::default();
    let mut invalid: HashSet<Uuid> = HashSet::with_capacity(orphans.len());
    for task in &orphans {
        invalid.insert(task.id);
        if remove_task(pool, store, task).await? {
            report.tasks_removed += 1;
        }
    }

    for mut rehearsal in db::rehearsals::list_rehearsals(pool).await? {
        let before = rehearsal.task_ids.len();
        rehearsal.task_ids.retain(|id| !invalid.contains(id));
        if rehearsal.task_ids.len() != before {
            db::rehearsals::set_task_ids(pool, rehearsal.id, &rehearsal.task_ids).await?;
        }
    }

    report.rehearsals_removed = db::rehearsals::delete_rehearsals_without_task_ids(pool).await?;
    info!(
        "Removed {} invalid tasks and {} emptied rehearsals",
        report.tasks_removed, report.rehearsals_removed
    );
    Ok(report)
}

async fn load_or_not_found(pool: &SqlitePool, id: Uuid) -> Result<Rehearsal> {
    db::rehearsals::load_rehearsal(pool, id)
        .await?
        .ok_or_else(not_found)
}

fn not_found() -> Error {
    Error::NotFound("Rehearsal not found".to_string())
}

fn parse_task_refs(refs: &[RecordRef]) -> Result<Vec<Uuid>> {
    refs.iter()
        .map(|r| uuid_utils::parse_id(r.id_str(), "Task"))
        .collect()
}

fn duplicate_on_unique_violation(e: Error) -> Error {
    if e.is_unique_violation() {
        Error::Duplicate(DUPLICATE_DATE.to_string())
    } else {
        e
    }
}
