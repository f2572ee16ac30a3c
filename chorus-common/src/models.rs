//! Song, task and rehearsal models
//!
//! Wire names follow the frontend's expectations: ids are `_id`, other
//! fields are camelCase, timestamps are RFC 3339 UTC with milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::time::serde_millis;
use crate::Error;

/// A song in the group's repertoire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub title: String,
    pub soloist: String,
    pub conductor: String,
    pub vp: String,
    /// Display position; reassigned by reorder
    pub order: i64,
    #[serde(with = "serde_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "serde_millis")]
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a song
#[derive(Debug, Clone, Deserialize)]
pub struct NewSong {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub soloist: String,
    #[serde(default)]
    pub conductor: String,
    #[serde(default)]
    pub vp: String,
}

/// Partial song update; absent fields are left unchanged
///
/// `order` is not patchable; a stray `order` key in the body is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongPatch {
    pub title: Option<String>,
    pub soloist: Option<String>,
    pub conductor: Option<String>,
    pub vp: Option<String>,
}

/// Kind of work a task asks of the group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    #[serde(rename = "learn")]
    Learn,
    #[serde(rename = "run on-book", alias = "run-on-book")]
    RunOnBook,
    #[serde(rename = "run off-book", alias = "run-off-book")]
    RunOffBook,
    #[serde(rename = "workshop")]
    Workshop,
    #[serde(rename = "sectionals")]
    Sectionals,
    #[serde(rename = "auditions")]
    Auditions,
}

impl TaskType {
    pub const ALL: [TaskType; 6] = [
        TaskType::Learn,
        TaskType::RunOnBook,
        TaskType::RunOffBook,
        TaskType::Workshop,
        TaskType::Sectionals,
        TaskType::Auditions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Learn => "learn",
            TaskType::RunOnBook => "run on-book",
            TaskType::RunOffBook => "run off-book",
            TaskType::Workshop => "workshop",
            TaskType::Sectionals => "sectionals",
            TaskType::Auditions => "auditions",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "learn" => Ok(TaskType::Learn),
            "run on-book" | "run-on-book" => Ok(TaskType::RunOnBook),
            "run off-book" | "run-off-book" => Ok(TaskType::RunOffBook),
            "workshop" => Ok(TaskType::Workshop),
            "sectionals" => Ok(TaskType::Sectionals),
            "auditions" => Ok(TaskType::Auditions),
            other => Err(Error::Validation(format!(
                "`{}` is not a valid task type",
                other
            ))),
        }
    }
}

/// A task as stored: the song is a bare reference
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub task_type: TaskType,
    pub song: Uuid,
    /// Public path of the uploaded recording (`/uploads/<file>`)
    pub recording: Option<String>,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial task update; absent fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub task_type: Option<TaskType>,
    pub song: Option<Uuid>,
    pub recording: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
    pub date: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
}

/// A task with its song reference replaced by the song itself
///
/// `song` is `None` when the reference no longer resolves.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTask {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub task_type: TaskType,
    pub song: Option<Song>,
    pub recording: Option<String>,
    pub description: Option<String>,
    #[serde(with = "serde_millis")]
    pub date: DateTime<Utc>,
    pub completed: bool,
    #[serde(with = "serde_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "serde_millis")]
    pub updated_at: DateTime<Utc>,
}

impl ResolvedTask {
    pub fn new(task: Task, song: Option<Song>) -> Self {
        Self {
            id: task.id,
            task_type: task.task_type,
            song,
            recording: task.recording,
            description: task.description,
            date: task.date,
            completed: task.completed,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// A rehearsal as stored: task ids in display order
#[derive(Debug, Clone, PartialEq)]
pub struct Rehearsal {
    pub id: Uuid,
    /// Always midnight UTC
    pub date: DateTime<Utc>,
    pub task_ids: Vec<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A rehearsal with its task list resolved down to songs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRehearsal {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(with = "serde_millis")]
    pub date: DateTime<Utc>,
    pub tasks: Vec<ResolvedTask>,
    pub notes: Option<String>,
    #[serde(with = "serde_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "serde_millis")]
    pub updated_at: DateTime<Utc>,
}

impl ResolvedRehearsal {
    pub fn new(rehearsal: Rehearsal, tasks: Vec<ResolvedTask>) -> Self {
        Self {
            id: rehearsal.id,
            date: rehearsal.date,
            tasks,
            notes: rehearsal.notes,
            created_at: rehearsal.created_at,
            updated_at: rehearsal.updated_at,
        }
    }
}

/// Body of a rehearsal create request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRehearsal {
    /// Any time on the wanted day; normalized to midnight UTC
    pub date: Option<String>,
    #[serde(default)]
    pub tasks: Vec<RecordRef>,
    pub notes: Option<String>,
}

/// Body of a rehearsal update request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RehearsalPatch {
    pub date: Option<String>,
    pub tasks: Option<Vec<RecordRef>>,
    /// `null` clears the notes; an absent key leaves them alone
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
}

/// Tell an explicit `null` (`Some(None)`) apart from a missing key (`None`)
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Reference to a record inside a request body
///
/// The frontend sends either bare ids or whole (populated) objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecordRef {
    Id(String),
    Object {
        #[serde(rename = "_id", alias = "id")]
        id: String,
    },
}

impl RecordRef {
    pub fn id_str(&self) -> &str {
        match self {
            RecordRef::Id(id) => id,
            RecordRef::Object { id } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_type_accepts_both_spellings() {
        assert_eq!("run on-book".parse::<TaskType>().unwrap(), TaskType::RunOnBook);
        assert_eq!("run-off-book".parse::<TaskType>().unwrap(), TaskType::RunOffBook);
        let parsed: TaskType = serde_json::from_value(json!("run-on-book")).unwrap();
        assert_eq!(parsed, TaskType::RunOnBook);
    }

    #[test]
    fn test_task_type_rejects_unknown() {
        let err = "karaoke".parse::<TaskType>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_task_type_display_matches_wire_name() {
        for task_type in TaskType::ALL {
            let wire = serde_json::to_value(task_type).unwrap();
            assert_eq!(wire, json!(task_type.to_string()));
        }
    }

    #[test]
    fn test_song_wire_shape() {
        let now = crate::time::parse_date("2025-01-02T03:04:05Z").unwrap();
        let song = Song {
            id: Uuid::nil(),
            title: "Hallelujah".into(),
            soloist: "Ana".into(),
            conductor: "Ben".into(),
            vp: "Cy".into(),
            order: 3,
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&song).unwrap();
        assert_eq!(value["_id"], json!(Uuid::nil().to_string()));
        assert_eq!(value["order"], json!(3));
        assert_eq!(value["createdAt"], json!("2025-01-02T03:04:05.000Z"));
    }

    #[test]
    fn test_rehearsal_patch_null_notes_differs_from_absent() {
        let absent: RehearsalPatch = serde_json::from_value(json!({})).unwrap();
        assert_eq!(absent.notes, None);

        let cleared: RehearsalPatch = serde_json::from_value(json!({"notes": null})).unwrap();
        assert_eq!(cleared.notes, Some(None));

        let set: RehearsalPatch = serde_json::from_value(json!({"notes": "warm up"})).unwrap();
        assert_eq!(set.notes, Some(Some("warm up".to_string())));
    }

    #[test]
    fn test_song_patch_ignores_order() {
        let patch: SongPatch =
            serde_json::from_value(json!({"title": "Renamed", "order": 9})).unwrap();
        assert_eq!(patch.title.as_deref(), Some("Renamed"));
    }

    #[test]
    fn test_record_ref_accepts_ids_and_objects() {
        let refs: Vec<RecordRef> = serde_json::from_value(json!([
            "a",
            {"_id": "b", "title": "ignored"},
            {"id": "c"}
        ]))
        .unwrap();
        let ids: Vec<&str> = refs.iter().map(RecordRef::id_str).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
