//! Database schema migrations.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{debug, warn};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Current schema version; 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    debug!(version, "schema migrated");
    Ok(())
}

/// Migration v1: board tasks, calendar events and the kv table.
///
/// Timestamps are RFC 3339 text; tags are stored as a JSON array.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            description TEXT,
            status      TEXT NOT NULL DEFAULT 'todo',
            priority    TEXT NOT NULL DEFAULT 'medium',
            tags        TEXT NOT NULL DEFAULT '[]',
            due_date    TEXT,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS events (
            id                TEXT PRIMARY KEY,
            title             TEXT NOT NULL,
            date              TEXT NOT NULL,
            all_day           INTEGER NOT NULL DEFAULT 0,
            start_time        TEXT,
            end_time          TEXT,
            description       TEXT,
            linked_task_id    TEXT,
            external_event_id TEXT,
            created_at        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
        CREATE INDEX IF NOT EXISTS idx_events_date ON events(date);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: task-to-remote-event links used by push, and a unique
/// index so one remote event maps to at most one local event.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS remote_links (
            task_id         TEXT PRIMARY KEY,
            remote_event_id TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_events_external_id
            ON events(external_event_id)
            WHERE external_event_id IS NOT NULL;",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}
