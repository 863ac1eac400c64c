//! # FocusBoard Core Library
//!
//! Core logic for FocusBoard: a Kanban task board and a local calendar,
//! kept in sync with a Google Calendar. The `focusboard` CLI is a thin
//! layer over this crate.
//!
//! ## Architecture
//!
//! - **Model**: board tasks and calendar events
//! - **Storage**: SQLite persistence, sync connection state and TOML
//!   configuration
//! - **Sync**: remote calendar client, event mapping and the pull/push
//!   engine behind a single-flight guard
//!
//! ## Key Components
//!
//! - [`Database`]: task, event and link persistence
//! - [`SyncEngine`]: pull/push cycle over any [`RemoteCalendar`]
//! - [`SyncService`]: operations exposed to the UI layer
//! - [`Config`]: application configuration management

pub mod auth;
pub mod error;
pub mod model;
pub mod storage;
pub mod sync;

pub use error::{ConfigError, CoreError, DatabaseError, SyncError, ValidationError};
pub use model::{EventPatch, LocalEvent, LocalTask, NewEvent, NewTask, TaskFilter, TaskPatch, TaskPriority, TaskStatus};
pub use storage::{Config, Database, SyncState, SyncStateStore};
pub use sync::{GoogleCalendarClient, RemoteCalendar, RemoteEvent, SyncEngine, SyncService};
