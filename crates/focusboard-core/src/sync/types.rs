//! Core types for calendar synchronization.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Start or end boundary of a remote event.
///
/// All-day events carry a bare date, timed events an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventTime {
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl EventTime {
    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Calendar day of this boundary as seen in `tz`.
    pub fn date_in(&self, tz: Tz) -> NaiveDate {
        match self {
            EventTime::Date(d) => *d,
            EventTime::DateTime(dt) => dt.with_timezone(&tz).date_naive(),
        }
    }

    /// Instant of this boundary; dates resolve to local midnight in `tz`.
    pub fn instant_in(&self, tz: Tz) -> DateTime<Utc> {
        match self {
            EventTime::Date(d) => local_instant(tz, *d, NaiveTime::MIN),
            EventTime::DateTime(dt) => *dt,
        }
    }
}

/// Interpret a wall-clock date and time in `tz`.
///
/// Ambiguous times take the earlier instant. Times skipped by a DST jump
/// are read with the offset in force just before the jump, so 02:30 on a
/// spring-forward night lands at 03:30 local.
pub fn local_instant(tz: Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let naive = NaiveDateTime::new(date, time);
    match tz.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => {
            let before = tz.offset_from_utc_datetime(&(naive - Duration::days(1))).fix();
            let utc = naive - Duration::seconds(i64::from(before.local_minus_utc()));
            Utc.from_utc_datetime(&utc)
        }
    }
}

/// A calendar event as the remote provider sees it.
///
/// `end` is inclusive for all-day events: a one-day event has
/// `start == end`. The provider's exclusive end date is converted at the
/// wire boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    /// Local task id stored in the event's private metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_task_ref: Option<String>,
}

impl RemoteEvent {
    /// All-day is inferred from a date-only start.
    pub fn all_day(&self) -> bool {
        self.start.is_date()
    }
}

/// Result of an insert-or-update against the remote calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    pub id: String,
    /// `true` when a new remote event was made.
    pub created: bool,
}

/// Optional bounds for listing remote events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub time_min: Option<DateTime<Utc>>,
    pub time_max: Option<DateTime<Utc>>,
}

/// Remote calendar metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarInfo {
    pub id: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullSummary {
    /// Remote events received.
    pub count: usize,
    pub tasks_updated: usize,
    pub events_inserted: usize,
    /// Already present locally, or unusable.
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Outcome of a full pull-then-push cycle.
///
/// A push failure does not undo the pull, so it is reported here rather
/// than as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub pull: PullSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<PushSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupResult {
    pub calendar_id: String,
    pub calendar_name: String,
}

/// Connection status reported to the UI layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<DateTime<Utc>>,
    pub syncing: bool,
}

/// Stage of the sync cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    Pulling,
    Merging,
    Pushing,
    Failed,
}
