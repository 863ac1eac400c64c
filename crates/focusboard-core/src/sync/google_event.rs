//! Google Calendar v3 wire format.
//!
//! Only the fields the sync reads or writes are modelled; everything else in
//! the provider payload is ignored on ingestion.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SyncError;
use crate::sync::types::{CalendarInfo, EventTime, RemoteEvent};

/// Event resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<GoogleEventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<GoogleEventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_properties: Option<ExtendedProperties>,
}

/// `start` / `end` object: exactly one of `date` and `dateTime` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedProperties {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub private: BTreeMap<String, String>,
}

/// One page of `events.list`. Items stay untyped so a single malformed
/// entry can be skipped without failing the page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Calendar or calendar-list entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResource {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarPage {
    #[serde(default)]
    pub items: Vec<CalendarResource>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl From<CalendarResource> for CalendarInfo {
    fn from(cal: CalendarResource) -> Self {
        CalendarInfo {
            summary: cal.summary.unwrap_or_default(),
            id: cal.id,
            time_zone: cal.time_zone,
        }
    }
}

impl GoogleEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }

    /// Validate and convert into a [`RemoteEvent`].
    ///
    /// A missing summary becomes an empty title; a missing or unreadable
    /// start or end is rejected.
    pub fn into_remote(self, task_ref_key: &str) -> Result<RemoteEvent, SyncError> {
        let start = self
            .start
            .as_ref()
            .ok_or_else(|| SyncError::Mapping("event has no start".into()))
            .and_then(|t| parse_boundary(t, "start"))?;
        let mut end = self
            .end
            .as_ref()
            .ok_or_else(|| SyncError::Mapping("event has no end".into()))
            .and_then(|t| parse_boundary(t, "end"))?;

        // Exclusive end date on the wire, inclusive last day locally.
        if let (EventTime::Date(s), EventTime::Date(e)) = (start, end) {
            let last = match e.pred_opt().filter(|last| *last >= s) {
                Some(last) => last,
                None => {
                    debug!(id = ?self.id, start = %s, end = %e, "all-day end not after start; one day assumed");
                    s
                }
            };
            end = EventTime::Date(last);
        }

        let external_task_ref = self
            .extended_properties
            .and_then(|mut props| props.private.remove(task_ref_key))
            .filter(|r| !r.trim().is_empty());

        Ok(RemoteEvent {
            id: self.id.filter(|id| !id.is_empty()),
            title: self.summary.unwrap_or_default(),
            description: self.description.filter(|d| !d.is_empty()),
            start,
            end,
            external_task_ref,
        })
    }

    /// Build the request body for `remote`. The id travels in the URL, not
    /// the body.
    pub fn from_remote(remote: &RemoteEvent, tz: Tz, task_ref_key: &str) -> Self {
        let (start, end) = match (remote.start, remote.end) {
            (EventTime::Date(s), end) => {
                let last = end.date_in(tz).max(s);
                (date_boundary(s), date_boundary(last + Duration::days(1)))
            }
            (EventTime::DateTime(s), end) => {
                let e = end.instant_in(tz).max(s);
                (time_boundary(s, tz), time_boundary(e, tz))
            }
        };

        let extended_properties = remote.external_task_ref.as_ref().map(|r| ExtendedProperties {
            private: BTreeMap::from([(task_ref_key.to_string(), r.clone())]),
        });

        GoogleEvent {
            id: None,
            status: None,
            summary: Some(remote.title.clone()),
            description: remote.description.clone(),
            start: Some(start),
            end: Some(end),
            extended_properties,
        }
    }
}

fn parse_boundary(t: &GoogleEventTime, which: &str) -> Result<EventTime, SyncError> {
    if let Some(raw) = t.date_time.as_deref() {
        return DateTime::parse_from_rfc3339(raw)
            .map(|dt| EventTime::DateTime(dt.with_timezone(&Utc)))
            .map_err(|e| SyncError::Mapping(format!("bad {which}.dateTime '{raw}': {e}")));
    }
    if let Some(raw) = t.date.as_deref() {
        return NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(EventTime::Date)
            .map_err(|e| SyncError::Mapping(format!("bad {which}.date '{raw}': {e}")));
    }
    Err(SyncError::Mapping(format!("{which} has neither date nor dateTime")))
}

fn date_boundary(date: NaiveDate) -> GoogleEventTime {
    GoogleEventTime {
        date: Some(date.format("%Y-%m-%d").to_string()),
        ..GoogleEventTime::default()
    }
}

fn time_boundary(at: DateTime<Utc>, tz: Tz) -> GoogleEventTime {
    GoogleEventTime {
        date_time: Some(at.with_timezone(&tz).to_rfc3339()),
        time_zone: Some(tz.name().to_string()),
        ..GoogleEventTime::default()
    }
}
