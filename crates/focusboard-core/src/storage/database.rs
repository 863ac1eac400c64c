//! SQLite-backed local store.
//!
//! Provides persistent storage for:
//! - Kanban board tasks
//! - Local calendar events
//! - Task-to-remote-event links used by push
//! - Key-value store for application state

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::{data_dir, migrations};
use crate::error::{CoreError, DatabaseError, ValidationError};
use crate::model::{
    EventPatch, LocalEvent, LocalTask, NewEvent, NewTask, TaskFilter, TaskPatch, TaskStatus,
};

const TASK_COLUMNS: &str =
    "id, title, description, status, priority, tags, due_date, created_at, updated_at";
const EVENT_COLUMNS: &str = "id, title, date, all_day, start_time, end_time, description, \
                             linked_task_id, external_event_id, created_at";
const TIME_FORMAT: &str = "%H:%M:%S";

/// SQLite database for tasks, events and sync bookkeeping.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/focusboard/focusboard.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unusable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("focusboard.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(|source| DatabaseError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    // ── Tasks ─────────────────────────────────────────────────────────

    /// Create a task with a fresh id.
    pub fn add_task(&self, new: NewTask) -> Result<LocalTask, CoreError> {
        new.validate()?;
        let now = Utc::now();
        let task = LocalTask {
            id: Uuid::new_v4().to_string(),
            title: new.title.trim().to_string(),
            description: new.description,
            status: new.status,
            priority: new.priority,
            tags: new.tags,
            due_date: new.due_date,
            created_at: now,
            updated_at: now,
        };
        self.insert_task(&task)?;
        debug!(task_id = %task.id, "task created");
        Ok(task)
    }

    fn insert_task(&self, task: &LocalTask) -> Result<(), DatabaseError> {
        let tags = serde_json::to_string(&task.tags)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO tasks (id, title, description, status, priority, tags, due_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                task.id,
                task.title,
                task.description,
                task.status.as_str(),
                task.priority.as_str(),
                tags,
                task.due_date.map(|d| d.to_rfc3339()),
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> Result<Option<LocalTask>, DatabaseError> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                TaskRow::read,
            )
            .optional()?;
        raw.map(TaskRow::decode).transpose()
    }

    /// All tasks, oldest first.
    pub fn list_tasks(&self) -> Result<Vec<LocalTask>, DatabaseError> {
        self.query_tasks(
            &format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at, id"),
            params![],
        )
    }

    pub fn tasks_by_status(&self, status: TaskStatus) -> Result<Vec<LocalTask>, DatabaseError> {
        self.query_tasks(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE status = ?1 ORDER BY created_at, id"),
            params![status.as_str()],
        )
    }

    /// Tasks matching the board filter.
    pub fn filter_tasks(&self, filter: &TaskFilter) -> Result<Vec<LocalTask>, DatabaseError> {
        Ok(self
            .list_tasks()?
            .into_iter()
            .filter(|t| filter.matches(t))
            .collect())
    }

    /// Tasks with a due date, earliest due first. These are the push candidates.
    pub fn tasks_with_due_date(&self) -> Result<Vec<LocalTask>, DatabaseError> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE due_date IS NOT NULL ORDER BY due_date, id"
            ),
            params![],
        )
    }

    fn query_tasks(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<LocalTask>, DatabaseError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, TaskRow::read)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.decode()?);
        }
        Ok(tasks)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    /// Returns `UnknownEntity` if the task does not exist.
    pub fn update_task(&self, id: &str, patch: TaskPatch) -> Result<LocalTask, CoreError> {
        let mut task = self
            .get_task(id)?
            .ok_or_else(|| unknown_entity("task", id))?;
        patch.apply(&mut task)?;
        task.updated_at = Utc::now();
        self.write_task(&task)?;
        Ok(task)
    }

    /// Move a task to another board column.
    pub fn move_task(&self, id: &str, status: TaskStatus) -> Result<LocalTask, CoreError> {
        self.update_task(
            id,
            TaskPatch {
                status: Some(status),
                ..TaskPatch::default()
            },
        )
    }

    /// Copy a task under a new id. The copy is not linked to any remote event.
    pub fn duplicate_task(&self, id: &str) -> Result<LocalTask, CoreError> {
        let original = self
            .get_task(id)?
            .ok_or_else(|| unknown_entity("task", id))?;
        let now = Utc::now();
        let copy = LocalTask {
            id: Uuid::new_v4().to_string(),
            title: format!("{} (copy)", original.title),
            created_at: now,
            updated_at: now,
            ..original
        };
        self.insert_task(&copy)?;
        Ok(copy)
    }

    /// Delete a task along with its remote link. Events referring to it
    /// keep existing but lose the reference.
    pub fn delete_task(&self, id: &str) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM remote_links WHERE task_id = ?1", params![id])?;
        tx.execute(
            "UPDATE events SET linked_task_id = NULL WHERE linked_task_id = ?1",
            params![id],
        )?;
        let removed = tx.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Overwrite the fields a remote event is allowed to change.
    ///
    /// Returns `false` if the task no longer exists.
    pub fn apply_remote_fields(
        &self,
        id: &str,
        title: &str,
        due_date: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE tasks SET title = ?2, due_date = ?3, updated_at = ?4 WHERE id = ?1",
            params![id, title, due_date.to_rfc3339(), Utc::now().to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    fn write_task(&self, task: &LocalTask) -> Result<(), DatabaseError> {
        let tags = serde_json::to_string(&task.tags)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        self.conn.execute(
            "UPDATE tasks SET title = ?2, description = ?3, status = ?4, priority = ?5,
                              tags = ?6, due_date = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                task.id,
                task.title,
                task.description,
                task.status.as_str(),
                task.priority.as_str(),
                tags,
                task.due_date.map(|d| d.to_rfc3339()),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ── Events ────────────────────────────────────────────────────────

    /// Insert an event with a fresh id.
    pub fn add_event(&self, new: NewEvent) -> Result<LocalEvent, CoreError> {
        new.validate()?;
        let event = LocalEvent {
            id: Uuid::new_v4().to_string(),
            title: new.title,
            date: new.date,
            all_day: new.all_day,
            start_time: if new.all_day { None } else { new.start_time },
            end_time: if new.all_day { None } else { new.end_time },
            description: new.description,
            linked_task_id: new.linked_task_id,
            external_event_id: new.external_event_id,
            created_at: Utc::now(),
        };
        self.conn.execute(
            &format!(
                "INSERT INTO events ({EVENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                event.id,
                event.title,
                event.date.to_string(),
                event.all_day,
                event.start_time.map(format_time),
                event.end_time.map(format_time),
                event.description,
                event.linked_task_id,
                event.external_event_id,
                event.created_at.to_rfc3339(),
            ],
        )?;
        debug!(event_id = %event.id, external_id = ?event.external_event_id, "event created");
        Ok(event)
    }

    pub fn get_event(&self, id: &str) -> Result<Option<LocalEvent>, DatabaseError> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                params![id],
                EventRow::read,
            )
            .optional()?;
        raw.map(EventRow::decode).transpose()
    }

    /// All events in calendar order.
    pub fn list_events(&self) -> Result<Vec<LocalEvent>, DatabaseError> {
        self.query_events(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM events ORDER BY date, all_day DESC, start_time, id"
            ),
            params![],
        )
    }

    /// Events on a single day.
    pub fn events_on(&self, date: NaiveDate) -> Result<Vec<LocalEvent>, DatabaseError> {
        self.query_events(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE date = ?1
                 ORDER BY all_day DESC, start_time, id"
            ),
            params![date.to_string()],
        )
    }

    /// Events whose date falls in `[from, to]`.
    pub fn events_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<LocalEvent>, DatabaseError> {
        self.query_events(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE date >= ?1 AND date <= ?2
                 ORDER BY date, all_day DESC, start_time, id"
            ),
            params![from.to_string(), to.to_string()],
        )
    }

    /// The local event mirroring a remote event, if one was pulled before.
    pub fn find_event_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<LocalEvent>, DatabaseError> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE external_event_id = ?1"),
                params![external_id],
                EventRow::read,
            )
            .optional()?;
        raw.map(EventRow::decode).transpose()
    }

    fn query_events(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<LocalEvent>, DatabaseError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, EventRow::read)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.decode()?);
        }
        Ok(events)
    }

    pub fn update_event(&self, id: &str, patch: EventPatch) -> Result<LocalEvent, CoreError> {
        let mut event = self
            .get_event(id)?
            .ok_or_else(|| unknown_entity("event", id))?;
        patch.apply(&mut event)?;
        if event.all_day {
            event.start_time = None;
            event.end_time = None;
        }
        self.conn.execute(
            "UPDATE events SET title = ?2, date = ?3, all_day = ?4, start_time = ?5,
                               end_time = ?6, description = ?7, linked_task_id = ?8
             WHERE id = ?1",
            params![
                event.id,
                event.title,
                event.date.to_string(),
                event.all_day,
                event.start_time.map(format_time),
                event.end_time.map(format_time),
                event.description,
                event.linked_task_id,
            ],
        )?;
        Ok(event)
    }

    /// Record the remote id of an exported event.
    pub fn set_external_event_id(
        &self,
        id: &str,
        external_id: &str,
    ) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE events SET external_event_id = ?2 WHERE id = ?1",
            params![id, external_id],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_event(&self, id: &str) -> Result<bool, DatabaseError> {
        let removed = self
            .conn
            .execute("DELETE FROM events WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    // ── Remote links ──────────────────────────────────────────────────

    /// Remote event id previously pushed for (or pulled into) a task.
    pub fn remote_link_for(&self, task_id: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT remote_event_id FROM remote_links WHERE task_id = ?1",
                params![task_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?)
    }

    pub fn set_remote_link(&self, task_id: &str, remote_event_id: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO remote_links (task_id, remote_event_id) VALUES (?1, ?2)",
            params![task_id, remote_event_id],
        )?;
        Ok(())
    }

    pub fn clear_remote_link(&self, task_id: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM remote_links WHERE task_id = ?1", params![task_id])?;
        Ok(())
    }

    /// Drop every link pointing at a remote event, e.g. after it was deleted remotely.
    pub fn clear_links_to_remote(&self, remote_event_id: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "DELETE FROM remote_links WHERE remote_event_id = ?1",
            params![remote_event_id],
        )?;
        Ok(())
    }

    // ── Key-value ─────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn unknown_entity(kind: &str, id: &str) -> ValidationError {
    ValidationError::UnknownEntity {
        kind: kind.into(),
        id: id.into(),
    }
}

fn format_time(t: NaiveTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

fn corrupt(column: &str, message: impl ToString) -> DatabaseError {
    DatabaseError::Corrupt {
        column: column.into(),
        message: message.to_string(),
    }
}

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| corrupt(column, e))
}

fn parse_time(column: &str, raw: &str) -> Result<NaiveTime, DatabaseError> {
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|e| corrupt(column, e))
}

/// Raw task columns; decoded outside the rusqlite row callback so parse
/// failures surface as [`DatabaseError::Corrupt`].
struct TaskRow {
    id: String,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    tags: String,
    due_date: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            status: row.get(3)?,
            priority: row.get(4)?,
            tags: row.get(5)?,
            due_date: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn decode(self) -> Result<LocalTask, DatabaseError> {
        Ok(LocalTask {
            status: self.status.parse().map_err(|e| corrupt("status", e))?,
            priority: self.priority.parse().map_err(|e| corrupt("priority", e))?,
            tags: serde_json::from_str(&self.tags).map_err(|e| corrupt("tags", e))?,
            due_date: self
                .due_date
                .as_deref()
                .map(|raw| parse_timestamp("due_date", raw))
                .transpose()?,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            id: self.id,
            title: self.title,
            description: self.description,
        })
    }
}

struct EventRow {
    id: String,
    title: String,
    date: String,
    all_day: bool,
    start_time: Option<String>,
    end_time: Option<String>,
    description: Option<String>,
    linked_task_id: Option<String>,
    external_event_id: Option<String>,
    created_at: String,
}

impl EventRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            date: row.get(2)?,
            all_day: row.get(3)?,
            start_time: row.get(4)?,
            end_time: row.get(5)?,
            description: row.get(6)?,
            linked_task_id: row.get(7)?,
            external_event_id: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn decode(self) -> Result<LocalEvent, DatabaseError> {
        Ok(LocalEvent {
            date: self.date.parse().map_err(|e| corrupt("date", e))?,
            start_time: self
                .start_time
                .as_deref()
                .map(|raw| parse_time("start_time", raw))
                .transpose()?,
            end_time: self
                .end_time
                .as_deref()
                .map(|raw| parse_time("end_time", raw))
                .transpose()?,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            id: self.id,
            title: self.title,
            all_day: self.all_day,
            description: self.description,
            linked_task_id: self.linked_task_id,
            external_event_id: self.external_event_id,
        })
    }
}
