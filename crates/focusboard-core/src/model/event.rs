//! Local calendar events.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// An entry in the local calendar.
///
/// `external_event_id` is the remote provider's id once the event has been
/// pulled from (or exported to) the remote calendar; pull uses it to avoid
/// inserting the same remote event twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalEvent {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Event-shaped data without store-assigned fields.
///
/// This is what the mapper produces from a remote event and what
/// [`crate::storage::Database::add_event`] accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub date: NaiveDate,
    pub all_day: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub description: Option<String>,
    pub linked_task_id: Option<String>,
    pub external_event_id: Option<String>,
}

impl NewEvent {
    pub fn all_day(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            date,
            all_day: true,
            start_time: None,
            end_time: None,
            description: None,
            linked_task_id: None,
            external_event_id: None,
        }
    }

    pub fn timed(title: impl Into<String>, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            title: title.into(),
            date,
            all_day: false,
            start_time: Some(start),
            end_time: Some(end),
            description: None,
            linked_task_id: None,
            external_event_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title".into()));
        }
        if !self.all_day && self.start_time.is_none() {
            return Err(ValidationError::MissingField("start_time".into()));
        }
        Ok(())
    }
}

/// Partial update for a local event. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub all_day: Option<bool>,
    pub start_time: Option<Option<NaiveTime>>,
    pub end_time: Option<Option<NaiveTime>>,
    pub description: Option<Option<String>>,
    pub linked_task_id: Option<Option<String>>,
}

impl EventPatch {
    pub(crate) fn apply(self, event: &mut LocalEvent) -> Result<(), ValidationError> {
        if let Some(title) = self.title {
            if title.trim().is_empty() {
                return Err(ValidationError::MissingField("title".into()));
            }
            event.title = title;
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(all_day) = self.all_day {
            event.all_day = all_day;
        }
        if let Some(start_time) = self.start_time {
            event.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            event.end_time = end_time;
        }
        if let Some(description) = self.description {
            event.description = description;
        }
        if let Some(linked_task_id) = self.linked_task_id {
            event.linked_task_id = linked_task_id;
        }
        if !event.all_day && event.start_time.is_none() {
            return Err(ValidationError::MissingField("start_time".into()));
        }
        Ok(())
    }
}
