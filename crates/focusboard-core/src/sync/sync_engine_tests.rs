//! Tests for sync_engine and service modules.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use chrono_tz::Tz;
    use rusqlite::params;

    use super::super::service::SyncService;
    use super::super::sync_engine::*;
    use crate::error::SyncError;
    use crate::model::{NewEvent, NewTask};
    use crate::storage::{Database, SyncStateStore};
    use crate::sync::calendar_client::RemoteCalendar;
    use crate::sync::types::{
        CalendarInfo, EventTime, RemoteEvent, SyncPhase, TimeWindow, UpsertOutcome,
    };

    /// In-process stand-in for the provider.
    #[derive(Default)]
    struct FakeRemote {
        listed: Mutex<Vec<RemoteEvent>>,
        upserts: Mutex<Vec<RemoteEvent>>,
        deleted: Mutex<Vec<String>>,
        calendars: Mutex<Vec<CalendarInfo>>,
        failing_titles: Mutex<HashSet<String>>,
        gone_ids: Mutex<HashSet<String>>,
        list_fails: bool,
        no_token: bool,
        next_id: AtomicUsize,
    }

    impl FakeRemote {
        fn with_events(events: Vec<RemoteEvent>) -> Self {
            Self {
                listed: Mutex::new(events),
                ..Self::default()
            }
        }

        fn fail_title(&self, title: &str) {
            self.failing_titles.lock().unwrap().insert(title.into());
        }
    }

    impl RemoteCalendar for FakeRemote {
        fn is_authenticated(&self) -> bool {
            !self.no_token
        }

        async fn list_events(
            &self,
            _calendar_id: &str,
            _window: &TimeWindow,
        ) -> Result<Vec<RemoteEvent>, SyncError> {
            tokio::task::yield_now().await;
            if self.list_fails {
                return Err(SyncError::RemoteUnavailable("HTTP 503: backend error".into()));
            }
            Ok(self.listed.lock().unwrap().clone())
        }

        async fn upsert_event(
            &self,
            _calendar_id: &str,
            event: &RemoteEvent,
        ) -> Result<UpsertOutcome, SyncError> {
            tokio::task::yield_now().await;
            if self.failing_titles.lock().unwrap().contains(&event.title) {
                return Err(SyncError::RemoteUnavailable("HTTP 500: boom".into()));
            }
            self.upserts.lock().unwrap().push(event.clone());
            match &event.id {
                Some(id) if self.gone_ids.lock().unwrap().contains(id) => {
                    Err(SyncError::NotFound(id.clone()))
                }
                Some(id) => Ok(UpsertOutcome {
                    id: id.clone(),
                    created: false,
                }),
                None => {
                    let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(UpsertOutcome {
                        id: format!("g{n}"),
                        created: true,
                    })
                }
            }
        }

        async fn delete_event(&self, _calendar_id: &str, event_id: &str) -> Result<(), SyncError> {
            if self.gone_ids.lock().unwrap().contains(event_id) {
                return Err(SyncError::NotFound(event_id.into()));
            }
            self.deleted.lock().unwrap().push(event_id.into());
            Ok(())
        }

        async fn get_calendar(&self, calendar_id: &str) -> Result<CalendarInfo, SyncError> {
            self.calendars
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == calendar_id)
                .cloned()
                .ok_or_else(|| SyncError::NotFound(calendar_id.into()))
        }

        async fn list_calendars(&self) -> Result<Vec<CalendarInfo>, SyncError> {
            Ok(self.calendars.lock().unwrap().clone())
        }

        async fn create_calendar(&self, name: &str) -> Result<CalendarInfo, SyncError> {
            let calendar = CalendarInfo {
                id: format!("{}@group.calendar.google.com", name.to_lowercase()),
                summary: name.into(),
                time_zone: None,
            };
            self.calendars.lock().unwrap().push(calendar.clone());
            Ok(calendar)
        }
    }

    fn engine(remote: FakeRemote) -> SyncEngine<FakeRemote> {
        SyncEngine::new(remote, chrono_tz::UTC)
    }

    fn connected_db() -> Database {
        let db = Database::open_memory().unwrap();
        SyncStateStore::new(&db).connect("primary").unwrap();
        db
    }

    fn insert_task(db: &Database, id: &str, title: &str) {
        let now = Utc::now().to_rfc3339();
        db.conn()
            .execute(
                "INSERT INTO tasks (id, title, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                params![id, title, now],
            )
            .unwrap();
    }

    fn timed(id: &str, title: &str, task_ref: Option<&str>) -> RemoteEvent {
        let start = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        RemoteEvent {
            id: Some(id.into()),
            title: title.into(),
            description: None,
            start: EventTime::DateTime(start),
            end: EventTime::DateTime(start + Duration::minutes(30)),
            external_task_ref: task_ref.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn pull_overwrites_linked_task_title_and_due_date() {
        let db = connected_db();
        insert_task(&db, "t1", "Old title");
        let engine = engine(FakeRemote::with_events(vec![timed("g1", "Standup", Some("t1"))]));

        let summary = engine.pull(&db).await.unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.tasks_updated, 1);
        assert_eq!(summary.events_inserted, 0);

        let task = db.get_task("t1").unwrap().unwrap();
        assert_eq!(task.title, "Standup");
        assert_eq!(
            task.due_date,
            Some(Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap())
        );
        assert_eq!(db.remote_link_for("t1").unwrap().as_deref(), Some("g1"));
    }

    #[tokio::test]
    async fn pulling_same_set_twice_creates_no_duplicates() {
        let db = connected_db();
        let engine = engine(FakeRemote::with_events(vec![
            timed("g1", "Standup", None),
            timed("g2", "Review", None),
        ]));

        let first = engine.pull(&db).await.unwrap();
        assert_eq!(first.events_inserted, 2);
        let second = engine.pull(&db).await.unwrap();
        assert_eq!(second.count, 2);
        assert_eq!(second.events_inserted, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(db.list_events().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn pull_drops_dangling_task_reference() {
        let db = connected_db();
        let engine = engine(FakeRemote::with_events(vec![timed("g1", "Orphan", Some("gone"))]));

        let summary = engine.pull(&db).await.unwrap();
        assert_eq!(summary.events_inserted, 1);
        let event = db.find_event_by_external_id("g1").unwrap().unwrap();
        assert!(event.linked_task_id.is_none());
        assert_eq!(event.title, "Orphan");
    }

    #[tokio::test]
    async fn pull_inserts_all_day_and_untitled_events() {
        let db = connected_db();
        let day = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let all_day = RemoteEvent {
            id: Some("g7".into()),
            title: "  ".into(),
            description: None,
            start: EventTime::Date(day),
            end: EventTime::Date(day),
            external_task_ref: None,
        };
        let engine = engine(FakeRemote::with_events(vec![all_day]));

        engine.pull(&db).await.unwrap();
        let event = db.find_event_by_external_id("g7").unwrap().unwrap();
        assert!(event.all_day);
        assert_eq!(event.date, day);
        assert_eq!(event.title, "(untitled)");
    }

    #[tokio::test]
    async fn pull_skips_events_without_id() {
        let db = connected_db();
        let mut event = timed("x", "No id", None);
        event.id = None;
        let engine = engine(FakeRemote::with_events(vec![event]));

        let summary = engine.pull(&db).await.unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.skipped, 1);
        assert!(db.list_events().unwrap().is_empty());
    }

    #[tokio::test]
    async fn pull_records_last_sync() {
        let db = connected_db();
        let engine = engine(FakeRemote::default());
        assert!(SyncStateStore::new(&db).state().unwrap().last_sync_at.is_none());

        engine.pull(&db).await.unwrap();
        assert!(SyncStateStore::new(&db).state().unwrap().last_sync_at.is_some());
    }

    #[tokio::test]
    async fn failed_pull_keeps_state_and_returns_to_idle() {
        let db = connected_db();
        let engine = engine(FakeRemote {
            list_fails: true,
            ..FakeRemote::default()
        });

        let err = engine.pull(&db).await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteUnavailable(_)));
        assert_eq!(err.status_code(), 500);
        assert!(SyncStateStore::new(&db).state().unwrap().last_sync_at.is_none());
        assert_eq!(engine.phase(), SyncPhase::Idle);
        assert!(!engine.is_syncing());
    }

    #[tokio::test]
    async fn unconfigured_calendar_is_rejected() {
        let db = Database::open_memory().unwrap();
        let engine = engine(FakeRemote::default());

        let err = engine.push(&db).await.unwrap_err();
        assert!(matches!(err, SyncError::NotConfigured));
        assert_eq!(err.status_code(), 401);
        assert!(!engine.is_syncing());
    }

    #[tokio::test]
    async fn push_creates_then_updates() {
        let db = connected_db();
        let due = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
        let task = db.add_task(NewTask::new("Write report").with_due_date(due)).unwrap();
        db.add_task(NewTask::new("Someday")).unwrap();
        let engine = engine(FakeRemote::default()).with_task_duration(Duration::minutes(45));

        let first = engine.push(&db).await.unwrap();
        assert_eq!((first.created, first.updated, first.unchanged), (1, 0, 0));
        assert_eq!(db.remote_link_for(&task.id).unwrap().as_deref(), Some("g1"));

        let second = engine.push(&db).await.unwrap();
        assert_eq!((second.created, second.updated, second.unchanged), (0, 1, 0));

        let upserts = engine.remote().upserts.lock().unwrap().clone();
        assert_eq!(upserts.len(), 2);
        assert_eq!(upserts[1].id.as_deref(), Some("g1"));
        assert_eq!(upserts[1].external_task_ref.as_deref(), Some(task.id.as_str()));
        assert_eq!(upserts[1].end, EventTime::DateTime(due + Duration::minutes(45)));
    }

    #[tokio::test]
    async fn push_counts_failures_as_unchanged() {
        let db = connected_db();
        let due = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
        for title in ["One", "Two", "Three"] {
            db.add_task(NewTask::new(title).with_due_date(due)).unwrap();
        }
        let remote = FakeRemote::default();
        remote.fail_title("Two");
        let engine = engine(remote);

        let summary = engine.push(&db).await.unwrap();
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.created + summary.updated, 2);
    }

    #[tokio::test]
    async fn push_clears_stale_link_and_recreates_next_time() {
        let db = connected_db();
        let due = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
        let task = db.add_task(NewTask::new("Stale").with_due_date(due)).unwrap();
        db.set_remote_link(&task.id, "deleted-remotely").unwrap();
        let remote = FakeRemote::default();
        remote.gone_ids.lock().unwrap().insert("deleted-remotely".into());
        let engine = engine(remote);

        let first = engine.push(&db).await.unwrap();
        assert_eq!(first.unchanged, 1);
        assert!(db.remote_link_for(&task.id).unwrap().is_none());

        let second = engine.push(&db).await.unwrap();
        assert_eq!(second.created, 1);
    }

    #[tokio::test]
    async fn concurrent_request_is_rejected_while_syncing() {
        let db = connected_db();
        let engine = engine(FakeRemote::with_events(vec![timed("g1", "Standup", None)]));

        let (first, second) = tokio::join!(engine.pull(&db), engine.push(&db));
        assert!(first.is_ok());
        let err = second.unwrap_err();
        assert!(matches!(err, SyncError::SyncInProgress));
        assert_eq!(err.status_code(), 409);
        assert_eq!(db.list_events().unwrap().len(), 1);

        assert!(!engine.is_syncing());
        engine.push(&db).await.unwrap();
    }

    #[tokio::test]
    async fn full_cycle_pulls_before_pushing() {
        let db = connected_db();
        insert_task(&db, "t1", "Old title");
        let engine = engine(FakeRemote::with_events(vec![timed("g1", "Standup", Some("t1"))]));

        let report = engine.sync(&db).await.unwrap();
        assert_eq!(report.pull.tasks_updated, 1);
        let push = report.push.unwrap();
        // t1 got its due date and link from the pull, so push updates g1.
        assert_eq!((push.created, push.updated), (0, 1));
        assert!(report.push_error.is_none());
        assert_eq!(
            engine.remote().upserts.lock().unwrap()[0].title,
            "Standup"
        );
    }

    #[tokio::test]
    async fn failed_push_keeps_pulled_changes_in_cycle_report() {
        let db = connected_db();
        insert_task(&db, "t1", "Old title");
        insert_task(&db, "t2", "Broken");
        db.conn()
            .execute("UPDATE tasks SET due_date = 'not-a-timestamp' WHERE id = 't2'", [])
            .unwrap();
        let engine = engine(FakeRemote::with_events(vec![timed("g1", "Standup", Some("t1"))]));

        let report = engine.sync(&db).await.unwrap();
        assert_eq!(report.pull.tasks_updated, 1);
        assert!(report.push.is_none());
        assert!(report.push_error.is_some());

        assert_eq!(db.get_task("t1").unwrap().unwrap().title, "Standup");
        let state = SyncStateStore::new(&db).state().unwrap();
        assert!(state.last_sync_at.is_some());
        assert!(!engine.is_syncing());
        assert_eq!(engine.phase(), SyncPhase::Idle);
    }

    #[tokio::test]
    async fn exported_linked_event_never_takes_over_its_task() {
        let db = connected_db();
        let due = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
        let task = db.add_task(NewTask::new("Write report").with_due_date(due)).unwrap();
        let engine = engine(FakeRemote::default());

        engine.push(&db).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let mut offsite = NewEvent::all_day("Offsite", day);
        offsite.linked_task_id = Some(task.id.clone());
        let offsite = db.add_event(offsite).unwrap();
        let exported = engine.export_event(&db, &offsite.id).await.unwrap();
        assert_eq!(exported.id, "g2");

        // The provider now lists both events under the ids it assigned.
        let upserts = engine.remote().upserts.lock().unwrap().clone();
        let claiming: Vec<_> = upserts
            .iter()
            .filter(|e| e.external_task_ref.as_deref() == Some(task.id.as_str()))
            .map(|e| e.title.clone())
            .collect();
        assert_eq!(claiming, vec!["Write report".to_string()]);
        let listed = upserts
            .into_iter()
            .zip(["g1", "g2"])
            .map(|(mut e, id)| {
                e.id = Some(id.into());
                e
            })
            .collect();
        *engine.remote().listed.lock().unwrap() = listed;

        let summary = engine.pull(&db).await.unwrap();
        assert_eq!(summary.tasks_updated, 1);
        assert_eq!(summary.events_inserted, 0);

        let after = db.get_task(&task.id).unwrap().unwrap();
        assert_eq!(after.title, "Write report");
        assert_eq!(after.due_date, Some(due));
        assert_eq!(db.remote_link_for(&task.id).unwrap().as_deref(), Some("g1"));
        assert_eq!(db.list_events().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_remote_event_referencing_a_linked_task_is_a_plain_event() {
        let db = connected_db();
        insert_task(&db, "t1", "Write report");
        db.set_remote_link("t1", "g1").unwrap();
        let engine = engine(FakeRemote::with_events(vec![timed("g7", "Offsite", Some("t1"))]));

        let summary = engine.pull(&db).await.unwrap();
        assert_eq!(summary.tasks_updated, 0);
        assert_eq!(summary.events_inserted, 1);

        assert_eq!(db.get_task("t1").unwrap().unwrap().title, "Write report");
        assert_eq!(db.remote_link_for("t1").unwrap().as_deref(), Some("g1"));
        let event = db.find_event_by_external_id("g7").unwrap().unwrap();
        assert!(event.linked_task_id.is_none());
    }

    #[tokio::test]
    async fn export_event_remembers_remote_id() {
        let db = connected_db();
        let day = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let event = db.add_event(NewEvent::all_day("Offsite", day)).unwrap();
        let engine = engine(FakeRemote::default());

        let outcome = engine.export_event(&db, &event.id).await.unwrap();
        assert!(outcome.created);
        let stored = db.get_event(&event.id).unwrap().unwrap();
        assert_eq!(stored.external_event_id.as_deref(), Some(outcome.id.as_str()));

        let again = engine.export_event(&db, &event.id).await.unwrap();
        assert!(!again.created);
        assert_eq!(again.id, outcome.id);

        let err = engine.export_event(&db, "missing").await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    // ── Service ───────────────────────────────────────────────────────

    fn remote_with_calendar() -> FakeRemote {
        let remote = FakeRemote::default();
        remote.calendars.lock().unwrap().push(CalendarInfo {
            id: "team@group.calendar.google.com".into(),
            summary: "Team".into(),
            time_zone: Some("America/Mexico_City".into()),
        });
        remote
    }

    #[tokio::test]
    async fn setup_validates_and_connects() {
        let db = Database::open_memory().unwrap();
        let service = SyncService::new(engine(remote_with_calendar()), &db);

        let err = service.setup("   ").await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), "'calendarId' is required");

        let result = service.setup(" team@group.calendar.google.com ").await.unwrap();
        assert_eq!(result.calendar_id, "team@group.calendar.google.com");
        assert_eq!(result.calendar_name, "Team");

        let status = service.status().unwrap();
        assert!(status.authenticated);
        assert_eq!(status.calendar_id.as_deref(), Some("team@group.calendar.google.com"));
    }

    #[tokio::test]
    async fn setup_with_unknown_calendar_does_not_connect() {
        let db = Database::open_memory().unwrap();
        let service = SyncService::new(engine(FakeRemote::default()), &db);

        assert!(service.setup("nope").await.is_err());
        assert!(!service.status().unwrap().authenticated);
    }

    #[tokio::test]
    async fn disconnect_then_status_is_unauthenticated() {
        let db = Database::open_memory().unwrap();
        let service = SyncService::new(engine(remote_with_calendar()), &db);
        service.setup("team@group.calendar.google.com").await.unwrap();
        service.pull().await.unwrap();

        service.disconnect().unwrap();
        let status = service.status().unwrap();
        assert!(!status.authenticated);
        assert!(status.calendar_id.is_none());
        assert!(status.last_sync_at.is_none());
    }

    #[tokio::test]
    async fn status_requires_a_credential() {
        let db = connected_db();
        let remote = FakeRemote {
            no_token: true,
            ..FakeRemote::default()
        };
        let service = SyncService::new(engine(remote), &db);
        let status = service.status().unwrap();
        assert!(!status.authenticated);
        assert_eq!(status.calendar_id.as_deref(), Some("primary"));
    }

    #[tokio::test]
    async fn ensure_calendar_reuses_or_creates() {
        let db = Database::open_memory().unwrap();
        let service = SyncService::new(engine(remote_with_calendar()), &db);

        let existing = service.ensure_calendar("Team").await.unwrap();
        assert_eq!(existing.calendar_id, "team@group.calendar.google.com");

        let created = service.ensure_calendar("FocusBoard").await.unwrap();
        assert_eq!(created.calendar_name, "FocusBoard");
        assert_eq!(service.engine().remote().calendars.lock().unwrap().len(), 2);
        assert_eq!(
            service.status().unwrap().calendar_id,
            Some(created.calendar_id)
        );
    }

    #[tokio::test]
    async fn delete_remote_event_proxies_and_validates() {
        let db = connected_db();
        db.set_remote_link("t1", "g1").unwrap();
        let service = SyncService::new(engine(FakeRemote::default()), &db);

        assert_eq!(
            service.delete_remote_event("").await.unwrap_err().status_code(),
            400
        );
        service.delete_remote_event("g1").await.unwrap();
        assert_eq!(
            service.engine().remote().deleted.lock().unwrap().as_slice(),
            ["g1".to_string()]
        );
        assert!(db.remote_link_for("t1").unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_of_missing_event_surfaces_not_found() {
        let db = connected_db();
        let remote = FakeRemote::default();
        remote.gone_ids.lock().unwrap().insert("g404".into());
        let service = SyncService::new(engine(remote), &db);

        let err = service.delete_remote_event("g404").await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[test]
    fn pull_range_builds_window() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let range = PullRange {
            lookback: Duration::days(1),
            lookahead: Some(Duration::days(7)),
        };
        let window = range.window_at(now);
        assert_eq!(window.time_min, Some(now - Duration::days(1)));
        assert_eq!(window.time_max, Some(now + Duration::days(7)));

        let tz: Tz = "Asia/Tokyo".parse().unwrap();
        let engine = SyncEngine::new(FakeRemote::default(), tz).with_range(range);
        assert_eq!(engine.time_zone(), tz);
    }
}
