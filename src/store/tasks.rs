//! Task repository: owner-scoped task and subtask CRUD.
//!
//! Every operation resolves the task through [`fetch_owned_task`], the single
//! ownership gate: a task that does not exist and a task owned by someone
//! else both surface as [`StoreError::TaskNotFound`], so callers cannot probe
//! for other users' ids. Subtask operations apply the gate to the parent
//! first, then look the subtask up under that task.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Deserializer, Serialize};

use super::{Store, StoreError};

/// A unit of work owned by exactly one user.
///
/// `user_id` is internal; serialized task shapes carry the eager-loaded
/// subtasks instead.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub result: String,
    pub finish_time: DateTime<Utc>,
    pub finish_criteria: String,
    pub resources: String,
    pub start_date: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub subtasks: Vec<Subtask>,
}

/// A unit nested under exactly one task.
///
/// `is_completed` is an integer 0/1, matching the stored column.
#[derive(Debug, Clone, Serialize)]
pub struct Subtask {
    pub id: i64,
    pub name: String,
    pub is_completed: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub task_id: i64,
}

/// Fields for creating a task. `start_date` defaults to now when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub name: String,
    pub result: String,
    pub finish_time: DateTime<Utc>,
    pub finish_criteria: String,
    pub resources: String,
    pub start_date: Option<DateTime<Utc>>,
}

/// Partial update for a task: `None` leaves the stored value unchanged,
/// `Some` overwrites it (including `Some("")` for the text fields).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub result: Option<String>,
    pub finish_time: Option<DateTime<Utc>>,
    pub finish_criteria: Option<String>,
    pub resources: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
}

/// Fields for creating a subtask. `is_completed` defaults to 0.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubtask {
    pub name: String,
    pub is_completed: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update for a subtask.
///
/// `due_date` is nullable in storage, so the patch distinguishes three wire
/// states: field absent (leave unchanged), `null` (clear), and a timestamp
/// (set).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubtaskPatch {
    pub name: Option<String>,
    pub is_completed: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

fn double_option<'de, D>(de: D) -> Result<Option<Option<DateTime<Utc>>>, D::Error>
where
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

const TASK_COLUMNS: &str =
    "id, name, result, finish_time, finish_criteria, resources, start_date, user_id";

const SUBTASK_COLUMNS: &str = "id, name, is_completed, due_date, task_id";

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        name: row.get(1)?,
        result: row.get(2)?,
        finish_time: row.get(3)?,
        finish_criteria: row.get(4)?,
        resources: row.get(5)?,
        start_date: row.get(6)?,
        user_id: row.get(7)?,
        subtasks: Vec::new(),
    })
}

fn subtask_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Subtask> {
    Ok(Subtask {
        id: row.get(0)?,
        name: row.get(1)?,
        is_completed: row.get(2)?,
        due_date: row.get(3)?,
        task_id: row.get(4)?,
    })
}

/// Ownership gate: resolve `(owner, task_id)` to the task row or fail with
/// `TaskNotFound`. Absence and ownership violation are indistinguishable.
fn fetch_owned_task(conn: &Connection, owner: i64, task_id: i64) -> Result<Task, StoreError> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2"),
        params![task_id, owner],
        task_from_row,
    )
    .optional()?
    .ok_or(StoreError::TaskNotFound)
}

fn load_subtasks(conn: &Connection, task_id: i64) -> Result<Vec<Subtask>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUBTASK_COLUMNS} FROM subtasks WHERE task_id = ?1 ORDER BY id"
    ))?;
    let subtasks = stmt
        .query_map(params![task_id], subtask_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(subtasks)
}

fn fetch_subtask(
    conn: &Connection,
    task_id: i64,
    subtask_id: i64,
) -> Result<Subtask, StoreError> {
    conn.query_row(
        &format!("SELECT {SUBTASK_COLUMNS} FROM subtasks WHERE id = ?1 AND task_id = ?2"),
        params![subtask_id, task_id],
        subtask_from_row,
    )
    .optional()?
    .ok_or(StoreError::SubtaskNotFound)
}

impl Store {
    /// Create a task for `owner`. `start_date` defaults to the current time.
    pub async fn create_task(&self, owner: i64, fields: NewTask) -> Result<Task, StoreError> {
        let conn = self.conn();
        let start_date = fields.start_date.unwrap_or_else(Utc::now);

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO tasks (name, result, finish_time, finish_criteria, resources, start_date, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    fields.name,
                    fields.result,
                    fields.finish_time,
                    fields.finish_criteria,
                    fields.resources,
                    start_date,
                    owner,
                ],
            )?;
            Ok(Task {
                id: conn.last_insert_rowid(),
                name: fields.name,
                result: fields.result,
                finish_time: fields.finish_time,
                finish_criteria: fields.finish_criteria,
                resources: fields.resources,
                start_date,
                user_id: owner,
                subtasks: Vec::new(),
            })
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }

    /// List `owner`'s tasks in storage order, subtasks eager-loaded.
    pub async fn list_tasks(&self, owner: i64) -> Result<Vec<Task>, StoreError> {
        let conn = self.conn();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 ORDER BY id"
            ))?;
            let mut tasks = stmt
                .query_map(params![owner], task_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            for task in &mut tasks {
                task.subtasks = load_subtasks(&conn, task.id)?;
            }
            Ok(tasks)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }

    /// Fetch one task owned by `owner`, subtasks eager-loaded.
    pub async fn get_task(&self, owner: i64, task_id: i64) -> Result<Task, StoreError> {
        let conn = self.conn();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut task = fetch_owned_task(&conn, owner, task_id)?;
            task.subtasks = load_subtasks(&conn, task_id)?;
            Ok(task)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }

    /// Apply a partial update: only `Some` fields overwrite stored values.
    pub async fn update_task(
        &self,
        owner: i64,
        task_id: i64,
        patch: TaskPatch,
    ) -> Result<Task, StoreError> {
        let conn = self.conn();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;

            let mut task = fetch_owned_task(&tx, owner, task_id)?;
            if let Some(name) = patch.name {
                task.name = name;
            }
            if let Some(result) = patch.result {
                task.result = result;
            }
            if let Some(finish_time) = patch.finish_time {
                task.finish_time = finish_time;
            }
            if let Some(finish_criteria) = patch.finish_criteria {
                task.finish_criteria = finish_criteria;
            }
            if let Some(resources) = patch.resources {
                task.resources = resources;
            }
            if let Some(start_date) = patch.start_date {
                task.start_date = start_date;
            }

            tx.execute(
                "UPDATE tasks SET name = ?1, result = ?2, finish_time = ?3,
                        finish_criteria = ?4, resources = ?5, start_date = ?6
                 WHERE id = ?7",
                params![
                    task.name,
                    task.result,
                    task.finish_time,
                    task.finish_criteria,
                    task.resources,
                    task.start_date,
                    task_id,
                ],
            )?;
            task.subtasks = load_subtasks(&tx, task_id)?;
            tx.commit()?;
            Ok(task)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }

    /// Delete a task, returning its last state. Subtasks cascade.
    pub async fn delete_task(&self, owner: i64, task_id: i64) -> Result<Task, StoreError> {
        let conn = self.conn();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;
            let mut task = fetch_owned_task(&tx, owner, task_id)?;
            task.subtasks = load_subtasks(&tx, task_id)?;
            tx.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            tx.commit()?;
            Ok(task)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }

    /// Create a subtask under a task owned by `owner`.
    pub async fn create_subtask(
        &self,
        owner: i64,
        task_id: i64,
        fields: NewSubtask,
    ) -> Result<Subtask, StoreError> {
        let conn = self.conn();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            fetch_owned_task(&conn, owner, task_id)?;

            let is_completed = fields.is_completed.unwrap_or(0);
            conn.execute(
                "INSERT INTO subtasks (name, is_completed, due_date, task_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![fields.name, is_completed, fields.due_date, task_id],
            )?;
            Ok(Subtask {
                id: conn.last_insert_rowid(),
                name: fields.name,
                is_completed,
                due_date: fields.due_date,
                task_id,
            })
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }

    /// List all subtasks of an owned task, regardless of completion state.
    pub async fn list_subtasks(
        &self,
        owner: i64,
        task_id: i64,
    ) -> Result<Vec<Subtask>, StoreError> {
        let conn = self.conn();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            fetch_owned_task(&conn, owner, task_id)?;
            load_subtasks(&conn, task_id)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }

    /// Partially update a subtask. Two-stage lookup: parent ownership first,
    /// then the subtask under that task.
    pub async fn update_subtask(
        &self,
        owner: i64,
        task_id: i64,
        subtask_id: i64,
        patch: SubtaskPatch,
    ) -> Result<Subtask, StoreError> {
        let conn = self.conn();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;

            fetch_owned_task(&tx, owner, task_id)?;
            let mut subtask = fetch_subtask(&tx, task_id, subtask_id)?;
            if let Some(name) = patch.name {
                subtask.name = name;
            }
            if let Some(is_completed) = patch.is_completed {
                subtask.is_completed = is_completed;
            }
            if let Some(due_date) = patch.due_date {
                subtask.due_date = due_date;
            }

            tx.execute(
                "UPDATE subtasks SET name = ?1, is_completed = ?2, due_date = ?3 WHERE id = ?4",
                params![
                    subtask.name,
                    subtask.is_completed,
                    subtask.due_date,
                    subtask_id,
                ],
            )?;
            tx.commit()?;
            Ok(subtask)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }

    /// Delete a subtask, returning it. Same two-stage rule as updates.
    pub async fn delete_subtask(
        &self,
        owner: i64,
        task_id: i64,
        subtask_id: i64,
    ) -> Result<Subtask, StoreError> {
        let conn = self.conn();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;
            fetch_owned_task(&tx, owner, task_id)?;
            let subtask = fetch_subtask(&tx, task_id, subtask_id)?;
            tx.execute("DELETE FROM subtasks WHERE id = ?1", params![subtask_id])?;
            tx.commit()?;
            Ok(subtask)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Store, StoreError};
    use super::*;
    use chrono::Duration;

    async fn store_with_user(email: &str) -> (Store, i64) {
        let store = Store::open(":memory:").await.unwrap();
        let user = store.register(email, "pw").await.unwrap();
        (store, user.id)
    }

    fn new_task(name: &str) -> NewTask {
        NewTask {
            name: name.to_string(),
            result: String::new(),
            finish_time: Utc::now() + Duration::hours(1),
            finish_criteria: "done".to_string(),
            resources: String::new(),
            start_date: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_start_date() {
        let (store, owner) = store_with_user("a@x.com").await;
        let before = Utc::now();
        let task = store.create_task(owner, new_task("T1")).await.unwrap();
        let after = Utc::now();

        assert!(task.id > 0);
        assert!(task.start_date >= before && task.start_date <= after);
        assert!(task.subtasks.is_empty());

        let fetched = store.get_task(owner, task.id).await.unwrap();
        assert_eq!(fetched.name, "T1");
        assert_eq!(fetched.start_date, task.start_date);
    }

    #[tokio::test]
    async fn test_list_scoped_to_owner() {
        let (store, alice) = store_with_user("a@x.com").await;
        let bob = store.register("b@x.com", "pw").await.unwrap().id;

        let task = store.create_task(alice, new_task("T1")).await.unwrap();

        assert_eq!(store.list_tasks(alice).await.unwrap().len(), 1);
        assert!(store.list_tasks(bob).await.unwrap().is_empty());

        let err = store.get_task(bob, task.id).await.unwrap_err();
        assert!(matches!(err, StoreError::TaskNotFound));
    }

    #[tokio::test]
    async fn test_partial_update_touches_only_given_fields() {
        let (store, owner) = store_with_user("a@x.com").await;
        let task = store.create_task(owner, new_task("T1")).await.unwrap();

        let patch = TaskPatch {
            name: Some("renamed".to_string()),
            ..Default::default()
        };
        let updated = store.update_task(owner, task.id, patch).await.unwrap();

        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.result, task.result);
        assert_eq!(updated.finish_time, task.finish_time);
        assert_eq!(updated.start_date, task.start_date);
    }

    #[tokio::test]
    async fn test_update_can_set_empty_string() {
        let (store, owner) = store_with_user("a@x.com").await;
        let mut fields = new_task("T1");
        fields.result = "partial output".to_string();
        let task = store.create_task(owner, fields).await.unwrap();

        let patch = TaskPatch {
            result: Some(String::new()),
            ..Default::default()
        };
        let updated = store.update_task(owner, task.id, patch).await.unwrap();
        assert_eq!(updated.result, "");
    }

    #[tokio::test]
    async fn test_update_unowned_task_is_not_found() {
        let (store, alice) = store_with_user("a@x.com").await;
        let bob = store.register("b@x.com", "pw").await.unwrap().id;
        let task = store.create_task(alice, new_task("T1")).await.unwrap();

        let err = store
            .update_task(bob, task.id, TaskPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TaskNotFound));
    }

    #[tokio::test]
    async fn test_delete_returns_last_state() {
        let (store, owner) = store_with_user("a@x.com").await;
        let task = store.create_task(owner, new_task("T1")).await.unwrap();
        store
            .create_subtask(
                owner,
                task.id,
                NewSubtask {
                    name: "S1".to_string(),
                    is_completed: None,
                    due_date: None,
                },
            )
            .await
            .unwrap();

        let deleted = store.delete_task(owner, task.id).await.unwrap();
        assert_eq!(deleted.name, "T1");
        assert_eq!(deleted.subtasks.len(), 1);

        let err = store.get_task(owner, task.id).await.unwrap_err();
        assert!(matches!(err, StoreError::TaskNotFound));
    }

    #[tokio::test]
    async fn test_delete_task_cascades_to_subtasks() {
        let (store, owner) = store_with_user("a@x.com").await;
        let keep = store.create_task(owner, new_task("keep")).await.unwrap();
        let doomed = store.create_task(owner, new_task("doomed")).await.unwrap();
        for task_id in [keep.id, doomed.id] {
            store
                .create_subtask(
                    owner,
                    task_id,
                    NewSubtask {
                        name: "S".to_string(),
                        is_completed: None,
                        due_date: None,
                    },
                )
                .await
                .unwrap();
        }

        store.delete_task(owner, doomed.id).await.unwrap();

        // The surviving task's subtasks are untouched; the deleted task's
        // are gone with it.
        assert_eq!(store.list_subtasks(owner, keep.id).await.unwrap().len(), 1);
        let err = store.list_subtasks(owner, doomed.id).await.unwrap_err();
        assert!(matches!(err, StoreError::TaskNotFound));
    }

    #[tokio::test]
    async fn test_subtask_defaults() {
        let (store, owner) = store_with_user("a@x.com").await;
        let task = store.create_task(owner, new_task("T1")).await.unwrap();

        let subtask = store
            .create_subtask(
                owner,
                task.id,
                NewSubtask {
                    name: "S1".to_string(),
                    is_completed: None,
                    due_date: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(subtask.is_completed, 0);
        assert!(subtask.due_date.is_none());
        assert_eq!(subtask.task_id, task.id);

        let listed = store.list_subtasks(owner, task.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, subtask.id);
    }

    #[tokio::test]
    async fn test_two_stage_not_found() {
        let (store, alice) = store_with_user("a@x.com").await;
        let bob = store.register("b@x.com", "pw").await.unwrap().id;
        let task = store.create_task(alice, new_task("T1")).await.unwrap();
        let subtask = store
            .create_subtask(
                alice,
                task.id,
                NewSubtask {
                    name: "S1".to_string(),
                    is_completed: None,
                    due_date: None,
                },
            )
            .await
            .unwrap();

        // Parent not owned: reported as a missing task, not a missing subtask.
        let err = store
            .update_subtask(bob, task.id, subtask.id, SubtaskPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TaskNotFound));

        // Parent owned but subtask id wrong.
        let err = store
            .update_subtask(alice, task.id, subtask.id + 1, SubtaskPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SubtaskNotFound));
    }

    #[tokio::test]
    async fn test_subtask_patch_clears_due_date() {
        let (store, owner) = store_with_user("a@x.com").await;
        let task = store.create_task(owner, new_task("T1")).await.unwrap();
        let subtask = store
            .create_subtask(
                owner,
                task.id,
                NewSubtask {
                    name: "S1".to_string(),
                    is_completed: None,
                    due_date: Some(Utc::now()),
                },
            )
            .await
            .unwrap();
        assert!(subtask.due_date.is_some());

        // Absent field leaves the due date alone.
        let patch: SubtaskPatch = serde_json::from_str(r#"{"is_completed": 1}"#).unwrap();
        let updated = store
            .update_subtask(owner, task.id, subtask.id, patch)
            .await
            .unwrap();
        assert_eq!(updated.is_completed, 1);
        assert!(updated.due_date.is_some());

        // Explicit null clears it.
        let patch: SubtaskPatch = serde_json::from_str(r#"{"due_date": null}"#).unwrap();
        let updated = store
            .update_subtask(owner, task.id, subtask.id, patch)
            .await
            .unwrap();
        assert!(updated.due_date.is_none());
    }

    #[tokio::test]
    async fn test_delete_subtask() {
        let (store, owner) = store_with_user("a@x.com").await;
        let task = store.create_task(owner, new_task("T1")).await.unwrap();
        let subtask = store
            .create_subtask(
                owner,
                task.id,
                NewSubtask {
                    name: "S1".to_string(),
                    is_completed: None,
                    due_date: None,
                },
            )
            .await
            .unwrap();

        let deleted = store
            .delete_subtask(owner, task.id, subtask.id)
            .await
            .unwrap();
        assert_eq!(deleted.id, subtask.id);

        let err = store
            .delete_subtask(owner, task.id, subtask.id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SubtaskNotFound));
    }
}
