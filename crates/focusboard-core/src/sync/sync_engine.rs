//! Sync engine for bidirectional calendar synchronization.
//!
//! A cycle moves through `Idle → Pulling → Merging → Pushing → Idle`, or
//! ends in `Failed` when a stage errors. Work already merged is kept; there
//! is no rollback. Only one cycle runs at a time: a request that arrives
//! while another is in flight is rejected with
//! [`SyncError::SyncInProgress`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, SyncError, ValidationError};
use crate::model::{LocalEvent, LocalTask};
use crate::storage::{Config, Database, SyncStateStore};
use crate::sync::calendar_client::RemoteCalendar;
use crate::sync::event_codec::{event_to_remote, remote_due_date, remote_to_event, task_to_remote};
use crate::sync::types::{
    CycleReport, PullSummary, PushSummary, RemoteEvent, SyncPhase, TimeWindow, UpsertOutcome,
};

/// How far around "now" a pull looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullRange {
    pub lookback: Duration,
    pub lookahead: Option<Duration>,
}

impl Default for PullRange {
    fn default() -> Self {
        Self {
            lookback: Duration::zero(),
            lookahead: None,
        }
    }
}

impl PullRange {
    pub fn window_at(&self, now: DateTime<Utc>) -> TimeWindow {
        TimeWindow {
            time_min: Some(now - self.lookback),
            time_max: self.lookahead.map(|d| now + d),
        }
    }
}

/// Sync engine managing bidirectional sync.
pub struct SyncEngine<R> {
    remote: R,
    time_zone: Tz,
    task_duration: Duration,
    range: PullRange,
    syncing: AtomicBool,
    phase: Mutex<SyncPhase>,
}

/// Holds the single-flight flag for one cycle and releases it on drop.
struct CycleGuard<'a> {
    syncing: &'a AtomicBool,
    phase: &'a Mutex<SyncPhase>,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = SyncPhase::Idle;
        self.syncing.store(false, Ordering::Release);
    }
}

impl<R: RemoteCalendar> SyncEngine<R> {
    pub fn new(remote: R, time_zone: Tz) -> Self {
        Self {
            remote,
            time_zone,
            task_duration: Duration::minutes(30),
            range: PullRange::default(),
            syncing: AtomicBool::new(false),
            phase: Mutex::new(SyncPhase::Idle),
        }
    }

    /// Engine configured from the `[google]` and `[sync]` sections.
    pub fn from_config(remote: R, config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(remote, config.time_zone()?)
            .with_task_duration(config.task_event_duration())
            .with_range(PullRange {
                lookback: Duration::days(i64::from(config.sync.lookback_days)),
                lookahead: config
                    .sync
                    .lookahead_days
                    .map(|d| Duration::days(i64::from(d))),
            }))
    }

    pub fn with_task_duration(mut self, duration: Duration) -> Self {
        self.task_duration = duration;
        self
    }

    pub fn with_range(mut self, range: PullRange) -> Self {
        self.range = range;
        self
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    fn set_phase(&self, phase: SyncPhase) {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = phase;
    }

    fn begin(&self) -> Result<CycleGuard<'_>, SyncError> {
        self.syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncError::SyncInProgress)?;
        Ok(CycleGuard {
            syncing: &self.syncing,
            phase: &self.phase,
        })
    }

    fn failed<T>(&self, result: Result<T, SyncError>) -> Result<T, SyncError> {
        if let Err(e) = &result {
            warn!(error = %e, "sync stage failed");
            self.set_phase(SyncPhase::Failed);
        }
        result
    }

    /// Pull using the configured window.
    pub async fn pull(&self, db: &Database) -> Result<PullSummary, SyncError> {
        self.pull_window(db, self.range.window_at(Utc::now())).await
    }

    /// Pull remote events in `window` into the local store.
    ///
    /// Events referencing a local task overwrite that task's title and due
    /// date. Everything else becomes a local event unless one with the same
    /// remote id already exists.
    pub async fn pull_window(
        &self,
        db: &Database,
        window: TimeWindow,
    ) -> Result<PullSummary, SyncError> {
        let _guard = self.begin()?;
        let calendar_id = self.failed(bound_calendar(db))?;
        self.failed(self.pull_stage(db, &calendar_id, window).await)
    }

    /// Push every due-dated task to the remote calendar.
    pub async fn push(&self, db: &Database) -> Result<PushSummary, SyncError> {
        let _guard = self.begin()?;
        let calendar_id = self.failed(bound_calendar(db))?;
        self.failed(self.push_stage(db, &calendar_id).await)
    }

    /// Full cycle: pull, then push.
    ///
    /// A failed pull is an error. A failed push after a successful pull is
    /// reported in the [`CycleReport`]; the pulled changes stay.
    pub async fn sync(&self, db: &Database) -> Result<CycleReport, SyncError> {
        let _guard = self.begin()?;
        let calendar_id = self.failed(bound_calendar(db))?;
        let window = self.range.window_at(Utc::now());
        let pull = self.failed(self.pull_stage(db, &calendar_id, window).await)?;

        let mut report = CycleReport {
            pull,
            ..CycleReport::default()
        };
        match self.failed(self.push_stage(db, &calendar_id).await) {
            Ok(push) => report.push = Some(push),
            Err(e) => report.push_error = Some(e.to_string()),
        }
        Ok(report)
    }

    async fn pull_stage(
        &self,
        db: &Database,
        calendar_id: &str,
        window: TimeWindow,
    ) -> Result<PullSummary, SyncError> {
        self.set_phase(SyncPhase::Pulling);
        let remote_events = self.remote.list_events(calendar_id, &window).await?;

        self.set_phase(SyncPhase::Merging);
        let mut summary = PullSummary {
            count: remote_events.len(),
            ..PullSummary::default()
        };
        for remote in &remote_events {
            self.merge(db, remote, &mut summary)?;
        }

        SyncStateStore::new(db).record_sync_completion(Utc::now())?;
        info!(
            count = summary.count,
            tasks_updated = summary.tasks_updated,
            events_inserted = summary.events_inserted,
            skipped = summary.skipped,
            "pull complete"
        );
        Ok(summary)
    }

    fn merge(
        &self,
        db: &Database,
        remote: &RemoteEvent,
        summary: &mut PullSummary,
    ) -> Result<(), SyncError> {
        // Already mirrored by a local event, pulled or exported earlier.
        if let Some(remote_id) = remote.id.as_deref() {
            if db.find_event_by_external_id(remote_id)?.is_some() {
                summary.skipped += 1;
                return Ok(());
            }
        }

        if let Some(task) = self.owning_task(db, remote)? {
            let title = if remote.title.trim().is_empty() {
                task.title.as_str()
            } else {
                remote.title.as_str()
            };
            db.apply_remote_fields(&task.id, title, remote_due_date(remote, self.time_zone))?;
            if let Some(id) = remote.id.as_deref() {
                db.set_remote_link(&task.id, id)?;
            }
            debug!(task_id = %task.id, "task updated from remote");
            summary.tasks_updated += 1;
            return Ok(());
        }

        if remote.id.is_none() {
            warn!(title = %remote.title, "skipping remote event without id");
            summary.skipped += 1;
            return Ok(());
        }

        let mut event = remote_to_event(remote, self.time_zone);
        // Only the task's own remote event links back to it.
        event.linked_task_id = None;
        db.add_event(event)?;
        summary.events_inserted += 1;
        Ok(())
    }

    /// The local task `remote` stands for, if any.
    ///
    /// A task already linked to a different remote event is not taken over:
    /// each task has at most one remote twin, and push owns that link.
    fn owning_task(
        &self,
        db: &Database,
        remote: &RemoteEvent,
    ) -> Result<Option<LocalTask>, SyncError> {
        let Some(task_ref) = remote.external_task_ref.as_deref() else {
            return Ok(None);
        };
        let Some(task) = db.get_task(task_ref)? else {
            return Ok(None);
        };
        match db.remote_link_for(&task.id)? {
            Some(linked) if remote.id.as_deref() != Some(linked.as_str()) => {
                debug!(task_id = %task.id, remote_id = ?remote.id, "task linked elsewhere; reference ignored");
                Ok(None)
            }
            _ => Ok(Some(task)),
        }
    }

    async fn push_stage(&self, db: &Database, calendar_id: &str) -> Result<PushSummary, SyncError> {
        self.set_phase(SyncPhase::Pushing);
        let mut summary = PushSummary::default();

        for task in db.tasks_with_due_date()? {
            let linked = db.remote_link_for(&task.id)?;
            let Some(event) = task_to_remote(&task, linked.clone(), self.task_duration) else {
                continue;
            };

            match self.remote.upsert_event(calendar_id, &event).await {
                Ok(outcome) => {
                    db.set_remote_link(&task.id, &outcome.id)?;
                    if outcome.created {
                        summary.created += 1;
                    } else {
                        summary.updated += 1;
                    }
                }
                Err(SyncError::NotFound(_)) if linked.is_some() => {
                    warn!(task_id = %task.id, "remote event gone; link cleared");
                    db.clear_remote_link(&task.id)?;
                    summary.unchanged += 1;
                }
                Err(e) => {
                    warn!(task_id = %task.id, error = %e, "push failed for task");
                    summary.unchanged += 1;
                }
            }
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            "push complete"
        );
        Ok(summary)
    }

    /// Delete a remote event. Local events are left to the caller.
    pub async fn delete_remote_event(&self, db: &Database, event_id: &str) -> Result<(), SyncError> {
        let event_id = event_id.trim();
        if event_id.is_empty() {
            return Err(ValidationError::MissingField("eventId".into()).into());
        }
        let calendar_id = bound_calendar(db)?;
        self.remote.delete_event(&calendar_id, event_id).await?;
        db.clear_links_to_remote(event_id)?;
        info!(event_id, "remote event deleted");
        Ok(())
    }

    /// Create or update the remote copy of one local calendar event and
    /// remember its remote id.
    pub async fn export_event(
        &self,
        db: &Database,
        event_id: &str,
    ) -> Result<UpsertOutcome, SyncError> {
        let event: LocalEvent =
            db.get_event(event_id)?
                .ok_or_else(|| ValidationError::UnknownEntity {
                    kind: "event".into(),
                    id: event_id.into(),
                })?;
        let calendar_id = bound_calendar(db)?;

        let outcome = self
            .remote
            .upsert_event(&calendar_id, &event_to_remote(&event, self.time_zone))
            .await?;
        db.set_external_event_id(&event.id, &outcome.id)?;
        Ok(outcome)
    }
}

fn bound_calendar(db: &Database) -> Result<String, SyncError> {
    SyncStateStore::new(db)
        .calendar_id()?
        .ok_or(SyncError::NotConfigured)
}
