//! Persisted calendar connection state.
//!
//! Lives in the `kv` table so it survives restarts alongside tasks and
//! events. The in-flight `syncing` flag is owned by the engine and is
//! never written here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Database;
use crate::error::DatabaseError;

const KEY_CONNECTED: &str = "sync.connected";
const KEY_CALENDAR_ID: &str = "sync.calendar_id";
const KEY_LAST_SYNC_AT: &str = "sync.last_sync_at";

/// Snapshot of the sync connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_calendar_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<DateTime<Utc>>,
    pub syncing: bool,
}

/// Reads and writes [`SyncState`] through the database kv table.
pub struct SyncStateStore<'a> {
    db: &'a Database,
}

impl<'a> SyncStateStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Current persisted state. `syncing` is always `false` here.
    pub fn state(&self) -> Result<SyncState, DatabaseError> {
        let connected = self.db.kv_get(KEY_CONNECTED)?.as_deref() == Some("true");
        let remote_calendar_id = self
            .db
            .kv_get(KEY_CALENDAR_ID)?
            .filter(|id| !id.is_empty());
        let last_sync_at = match self.db.kv_get(KEY_LAST_SYNC_AT)? {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(&raw)
                    .map(|d| d.with_timezone(&Utc))
                    .map_err(|e| DatabaseError::Corrupt {
                        column: KEY_LAST_SYNC_AT.into(),
                        message: e.to_string(),
                    })?,
            ),
            None => None,
        };

        Ok(SyncState {
            connected,
            remote_calendar_id,
            last_sync_at,
            syncing: false,
        })
    }

    /// Bound calendar id, only while connected.
    pub fn calendar_id(&self) -> Result<Option<String>, DatabaseError> {
        let state = self.state()?;
        Ok(state.remote_calendar_id.filter(|_| state.connected))
    }

    /// Bind to a remote calendar.
    ///
    /// Connecting again with the same id changes nothing; returns whether
    /// anything was written.
    pub fn connect(&self, calendar_id: &str) -> Result<bool, DatabaseError> {
        let current = self.state()?;
        if current.connected && current.remote_calendar_id.as_deref() == Some(calendar_id) {
            return Ok(false);
        }

        let tx = self.db.conn().unchecked_transaction()?;
        if current.remote_calendar_id.as_deref() != Some(calendar_id) {
            // Last sync time belongs to the previous calendar.
            self.db.kv_delete(KEY_LAST_SYNC_AT)?;
        }
        self.db.kv_set(KEY_CALENDAR_ID, calendar_id)?;
        self.db.kv_set(KEY_CONNECTED, "true")?;
        tx.commit()?;
        Ok(true)
    }

    /// Forget the binding. Tasks, events and remote links are untouched.
    pub fn disconnect(&self) -> Result<(), DatabaseError> {
        let tx = self.db.conn().unchecked_transaction()?;
        self.db.kv_set(KEY_CONNECTED, "false")?;
        self.db.kv_delete(KEY_CALENDAR_ID)?;
        self.db.kv_delete(KEY_LAST_SYNC_AT)?;
        tx.commit()?;
        Ok(())
    }

    pub fn record_sync_completion(&self, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        self.db.kv_set(KEY_LAST_SYNC_AT, &at.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fresh_store_is_disconnected() {
        let db = Database::open_memory().unwrap();
        let store = SyncStateStore::new(&db);
        assert_eq!(store.state().unwrap(), SyncState::default());
        assert!(store.calendar_id().unwrap().is_none());
    }

    #[test]
    fn connect_is_idempotent() {
        let db = Database::open_memory().unwrap();
        let store = SyncStateStore::new(&db);
        assert!(store.connect("cal-1").unwrap());
        assert!(!store.connect("cal-1").unwrap());

        let state = store.state().unwrap();
        assert!(state.connected);
        assert_eq!(state.remote_calendar_id.as_deref(), Some("cal-1"));
    }

    #[test]
    fn switching_calendar_resets_last_sync() {
        let db = Database::open_memory().unwrap();
        let store = SyncStateStore::new(&db);
        store.connect("cal-1").unwrap();
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        store.record_sync_completion(at).unwrap();
        assert_eq!(store.state().unwrap().last_sync_at, Some(at));

        store.connect("cal-2").unwrap();
        assert!(store.state().unwrap().last_sync_at.is_none());
    }

    #[test]
    fn disconnect_clears_binding_but_not_data() {
        let db = Database::open_memory().unwrap();
        db.kv_set("other", "kept").unwrap();
        let store = SyncStateStore::new(&db);
        store.connect("cal-1").unwrap();
        store.record_sync_completion(Utc::now()).unwrap();

        store.disconnect().unwrap();
        let state = store.state().unwrap();
        assert!(!state.connected);
        assert!(state.remote_calendar_id.is_none());
        assert!(state.last_sync_at.is_none());
        assert_eq!(db.kv_get("other").unwrap().as_deref(), Some("kept"));

        store.disconnect().unwrap();
    }

    #[test]
    fn state_serializes_camel_case() {
        let state = SyncState {
            connected: true,
            remote_calendar_id: Some("cal".into()),
            last_sync_at: None,
            syncing: false,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["remoteCalendarId"], "cal");
        assert!(json.get("lastSyncAt").is_none());
    }
}
