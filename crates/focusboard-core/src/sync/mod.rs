//! Google Calendar synchronization layer.
//!
//! Provides bidirectional sync between the local SQLite store and a remote
//! calendar: pull brings remote events in, push writes due-dated tasks out.

pub mod calendar_client;
pub mod event_codec;
pub mod google_event;
pub mod service;
pub mod sync_engine;
pub mod types;

#[cfg(test)]
mod google_event_tests;
#[cfg(test)]
mod sync_engine_tests;
#[cfg(test)]
mod types_tests;

pub use calendar_client::{GoogleCalendarClient, RemoteCalendar};
pub use event_codec::{event_to_remote, remote_due_date, remote_to_event, task_to_remote};
pub use service::SyncService;
pub use sync_engine::{PullRange, SyncEngine};
pub use types::{
    CalendarInfo, CycleReport, EventTime, PullSummary, PushSummary, RemoteEvent, RemoteStatus,
    SetupResult, SyncPhase, TimeWindow, UpsertOutcome,
};
