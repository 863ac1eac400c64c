//! Trigger surface for the UI layer.
//!
//! Each operation is a plain async function returning a result; errors
//! carry a status code via [`SyncError::status_code`].

use tracing::info;

use crate::error::{SyncError, ValidationError};
use crate::storage::{Database, SyncStateStore};
use crate::sync::calendar_client::RemoteCalendar;
use crate::sync::sync_engine::SyncEngine;
use crate::sync::types::{
    CalendarInfo, CycleReport, PullSummary, PushSummary, RemoteStatus, SetupResult, TimeWindow,
    UpsertOutcome,
};

pub struct SyncService<'a, R> {
    engine: SyncEngine<R>,
    db: &'a Database,
}

impl<'a, R: RemoteCalendar> SyncService<'a, R> {
    pub fn new(engine: SyncEngine<R>, db: &'a Database) -> Self {
        Self { engine, db }
    }

    pub fn engine(&self) -> &SyncEngine<R> {
        &self.engine
    }

    pub async fn pull(&self) -> Result<PullSummary, SyncError> {
        self.engine.pull(self.db).await
    }

    pub async fn pull_window(&self, window: TimeWindow) -> Result<PullSummary, SyncError> {
        self.engine.pull_window(self.db, window).await
    }

    pub async fn push(&self) -> Result<PushSummary, SyncError> {
        self.engine.push(self.db).await
    }

    pub async fn cycle(&self) -> Result<CycleReport, SyncError> {
        self.engine.sync(self.db).await
    }

    /// Bind to an existing remote calendar after checking it is reachable.
    pub async fn setup(&self, calendar_id: &str) -> Result<SetupResult, SyncError> {
        let calendar_id = calendar_id.trim();
        if calendar_id.is_empty() {
            return Err(ValidationError::MissingField("calendarId".into()).into());
        }
        let calendar = self.engine.remote().get_calendar(calendar_id).await?;
        self.connect(calendar)
    }

    /// Bind to the calendar named `name`, creating it if none exists.
    pub async fn ensure_calendar(&self, name: &str) -> Result<SetupResult, SyncError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingField("name".into()).into());
        }
        let existing = self
            .engine
            .remote()
            .list_calendars()
            .await?
            .into_iter()
            .find(|c| c.summary == name);
        let calendar = match existing {
            Some(calendar) => calendar,
            None => {
                info!(name, "creating remote calendar");
                self.engine.remote().create_calendar(name).await?
            }
        };
        self.connect(calendar)
    }

    fn connect(&self, calendar: CalendarInfo) -> Result<SetupResult, SyncError> {
        SyncStateStore::new(self.db).connect(&calendar.id)?;
        info!(calendar_id = %calendar.id, "calendar connected");
        let calendar_name = if calendar.summary.is_empty() {
            calendar.id.clone()
        } else {
            calendar.summary
        };
        Ok(SetupResult {
            calendar_id: calendar.id,
            calendar_name,
        })
    }

    /// Authenticated only while connected and holding a credential.
    pub fn status(&self) -> Result<RemoteStatus, SyncError> {
        let state = SyncStateStore::new(self.db).state()?;
        let calendar_id = state.remote_calendar_id.filter(|_| state.connected);
        Ok(RemoteStatus {
            authenticated: state.connected && self.engine.remote().is_authenticated(),
            calendar_id,
            last_sync_at: state.last_sync_at,
            syncing: self.engine.is_syncing(),
        })
    }

    pub fn disconnect(&self) -> Result<(), SyncError> {
        SyncStateStore::new(self.db).disconnect()?;
        info!("calendar disconnected");
        Ok(())
    }

    pub async fn delete_remote_event(&self, event_id: &str) -> Result<(), SyncError> {
        self.engine.delete_remote_event(self.db, event_id).await
    }

    pub async fn export_event(&self, event_id: &str) -> Result<UpsertOutcome, SyncError> {
        self.engine.export_event(self.db, event_id).await
    }
}
