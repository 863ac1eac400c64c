//! Remote calendar access.
//!
//! [`RemoteCalendar`] is the seam the sync engine talks to;
//! [`GoogleCalendarClient`] implements it against the Google Calendar v3
//! REST API.

use std::future::Future;

use chrono::Utc;
use chrono_tz::Tz;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{ConfigError, CoreError, SyncError, ValidationError};
use crate::storage::Config;
use crate::sync::google_event::{CalendarPage, CalendarResource, EventPage, GoogleEvent};
use crate::sync::types::{CalendarInfo, RemoteEvent, TimeWindow, UpsertOutcome};

/// Uniform interface over a remote calendar provider.
pub trait RemoteCalendar {
    /// Whether a credential is available. Does not contact the provider.
    fn is_authenticated(&self) -> bool;

    /// Single expanded occurrences in `window`, ordered by start.
    fn list_events(
        &self,
        calendar_id: &str,
        window: &TimeWindow,
    ) -> impl Future<Output = Result<Vec<RemoteEvent>, SyncError>> + Send;

    /// Update when `event.id` is set, insert otherwise.
    fn upsert_event(
        &self,
        calendar_id: &str,
        event: &RemoteEvent,
    ) -> impl Future<Output = Result<UpsertOutcome, SyncError>> + Send;

    /// Remove an event; [`SyncError::NotFound`] if it is already gone.
    fn delete_event(
        &self,
        calendar_id: &str,
        event_id: &str,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    fn get_calendar(
        &self,
        calendar_id: &str,
    ) -> impl Future<Output = Result<CalendarInfo, SyncError>> + Send;

    fn list_calendars(&self) -> impl Future<Output = Result<Vec<CalendarInfo>, SyncError>> + Send;

    fn create_calendar(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<CalendarInfo, SyncError>> + Send;
}

/// Google Calendar API client.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    time_zone: Tz,
    task_ref_key: String,
}

impl GoogleCalendarClient {
    /// Create a client for `base_url` (e.g. `https://www.googleapis.com/calendar/v3`).
    ///
    /// # Errors
    /// Returns a validation error if `base_url` is not an absolute URL.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, SyncError> {
        url::Url::parse(base_url).map_err(|e| {
            SyncError::Validation(ValidationError::InvalidValue {
                field: "api_base_url".into(),
                message: e.to_string(),
            })
        })?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            time_zone: chrono_tz::UTC,
            task_ref_key: "fbTaskId".into(),
        })
    }

    /// Client configured from the `[google]` section.
    pub fn from_config(config: &Config, token: Option<String>) -> Result<Self, CoreError> {
        let client = Self::new(&config.google.api_base_url, token)?
            .with_time_zone(config.time_zone()?)
            .with_task_ref_key(&config.google.task_ref_key)?;
        Ok(client)
    }

    pub fn with_time_zone(mut self, tz: Tz) -> Self {
        self.time_zone = tz;
        self
    }

    pub fn with_task_ref_key(mut self, key: &str) -> Result<Self, ConfigError> {
        if key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "google.task_ref_key".into(),
                message: "must not be empty".into(),
            });
        }
        self.task_ref_key = key.to_string();
        Ok(self)
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    fn token(&self) -> Result<&str, SyncError> {
        self.token.as_deref().ok_or(SyncError::Unauthenticated)
    }

    fn events_url(&self, calendar_id: &str) -> Result<String, SyncError> {
        if calendar_id.trim().is_empty() {
            return Err(SyncError::NotConfigured);
        }
        Ok(format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        ))
    }

    fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, SyncError> {
        let token = self.token()?;
        debug!(%method, url, "google calendar request");
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    /// Send and map non-2xx statuses onto the sync error taxonomy.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, SyncError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED => SyncError::Unauthenticated,
            StatusCode::FORBIDDEN => SyncError::Forbidden(format!("{what}: {}", trim_body(&body))),
            StatusCode::NOT_FOUND | StatusCode::GONE => SyncError::NotFound(what.to_string()),
            _ => SyncError::RemoteUnavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                trim_body(&body)
            )),
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, SyncError> {
        let response = self.send(request, what).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn parse_item(&self, item: serde_json::Value) -> Option<RemoteEvent> {
        let id = item.get("id").and_then(|v| v.as_str()).unwrap_or("?").to_string();
        let event: GoogleEvent = match serde_json::from_value(item) {
            Ok(event) => event,
            Err(e) => {
                warn!(event_id = %id, error = %e, "skipping malformed remote event");
                return None;
            }
        };
        if event.is_cancelled() {
            debug!(event_id = %id, "skipping cancelled remote event");
            return None;
        }
        match event.into_remote(&self.task_ref_key) {
            Ok(remote) => Some(remote),
            Err(e) => {
                warn!(event_id = %id, error = %e, "skipping malformed remote event");
                None
            }
        }
    }
}

fn trim_body(body: &str) -> &str {
    let body = body.trim();
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

impl RemoteCalendar for GoogleCalendarClient {
    fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<RemoteEvent>, SyncError> {
        let url = self.events_url(calendar_id)?;
        let time_min = window.time_min.unwrap_or_else(Utc::now).to_rfc3339();
        let time_max = window.time_max.map(|t| t.to_rfc3339());

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("timeMin", time_min.clone()),
            ];
            if let Some(max) = &time_max {
                query.push(("timeMax", max.clone()));
            }
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let request = self.request(Method::GET, &url)?.query(&query);
            let page: EventPage = self.send_json(request, calendar_id).await?;
            events.extend(page.items.into_iter().filter_map(|item| self.parse_item(item)));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(calendar_id, count = events.len(), "listed remote events");
        Ok(events)
    }

    async fn upsert_event(
        &self,
        calendar_id: &str,
        event: &RemoteEvent,
    ) -> Result<UpsertOutcome, SyncError> {
        let url = self.events_url(calendar_id)?;
        let body = GoogleEvent::from_remote(event, self.time_zone, &self.task_ref_key);

        let (request, existing) = match event.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => (
                self.request(Method::PUT, &format!("{url}/{}", urlencoding::encode(id)))?,
                Some(id),
            ),
            None => (self.request(Method::POST, &url)?, None),
        };

        let saved: GoogleEvent = self
            .send_json(request.json(&body), existing.unwrap_or(calendar_id))
            .await?;
        let id = saved
            .id
            .filter(|id| !id.is_empty())
            .or_else(|| existing.map(str::to_string))
            .ok_or_else(|| SyncError::Mapping("provider returned an event without id".into()))?;

        Ok(UpsertOutcome {
            id,
            created: existing.is_none(),
        })
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), SyncError> {
        if event_id.trim().is_empty() {
            return Err(ValidationError::MissingField("eventId".into()).into());
        }
        let url = format!(
            "{}/{}",
            self.events_url(calendar_id)?,
            urlencoding::encode(event_id)
        );
        self.send(self.request(Method::DELETE, &url)?, event_id).await?;
        Ok(())
    }

    async fn get_calendar(&self, calendar_id: &str) -> Result<CalendarInfo, SyncError> {
        if calendar_id.trim().is_empty() {
            return Err(SyncError::NotConfigured);
        }
        let url = format!("{}/calendars/{}", self.base_url, urlencoding::encode(calendar_id));
        let cal: CalendarResource = self
            .send_json(self.request(Method::GET, &url)?, calendar_id)
            .await?;
        Ok(cal.into())
    }

    async fn list_calendars(&self) -> Result<Vec<CalendarInfo>, SyncError> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.request(Method::GET, &url)?;
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let page: CalendarPage = self.send_json(request, "calendarList").await?;
            calendars.extend(page.items.into_iter().map(CalendarInfo::from));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        Ok(calendars)
    }

    async fn create_calendar(&self, name: &str) -> Result<CalendarInfo, SyncError> {
        if name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".into()).into());
        }
        let url = format!("{}/calendars", self.base_url);
        let body = json!({ "summary": name, "timeZone": self.time_zone.name() });
        let cal: CalendarResource = self
            .send_json(self.request(Method::POST, &url)?.json(&body), name)
            .await?;
        Ok(cal.into())
    }
}
