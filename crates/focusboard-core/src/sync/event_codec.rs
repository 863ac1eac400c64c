//! Conversion between local events/tasks and remote events.
//!
//! All functions here are pure and total: any local record maps to a
//! remote event and any remote event maps back to a local one.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::model::{LocalEvent, LocalTask, NewEvent};
use crate::sync::types::{local_instant, EventTime, RemoteEvent};

/// Title given to remote events that have none.
pub const UNTITLED: &str = "(untitled)";

/// Remote form of a local calendar event.
///
/// A timed event without a start time starts at midnight; without an end
/// time it lasts one hour. An end time earlier than the start is taken to
/// fall on the next day.
///
/// No task reference is written, even for events linked to a task: the
/// task's own remote event, created by push, is the only one carrying it.
pub fn event_to_remote(event: &LocalEvent, tz: Tz) -> RemoteEvent {
    let (start, end) = if event.all_day {
        (EventTime::Date(event.date), EventTime::Date(event.date))
    } else {
        let start_time = event.start_time.unwrap_or(NaiveTime::MIN);
        let start = local_instant(tz, event.date, start_time);
        let end = match event.end_time {
            Some(end_time) if end_time >= start_time => local_instant(tz, event.date, end_time),
            Some(end_time) => {
                let next_day = event.date.succ_opt().unwrap_or(event.date);
                local_instant(tz, next_day, end_time)
            }
            None => start + Duration::hours(1),
        };
        (EventTime::DateTime(start), EventTime::DateTime(end))
    };

    RemoteEvent {
        id: event.external_event_id.clone(),
        title: event.title.clone(),
        description: event.description.clone(),
        start,
        end,
        external_task_ref: None,
    }
}

/// Remote form of a task's due date: a timed event of `duration` starting
/// at the due instant and carrying the task id as its reference.
///
/// Tasks without a due date have no remote form.
pub fn task_to_remote(
    task: &LocalTask,
    remote_id: Option<String>,
    duration: Duration,
) -> Option<RemoteEvent> {
    let due = task.due_date?;
    Some(RemoteEvent {
        id: remote_id,
        title: task.title.clone(),
        description: task.description.clone(),
        start: EventTime::DateTime(due),
        end: EventTime::DateTime(due + duration),
        external_task_ref: Some(task.id.clone()),
    })
}

/// Local event for a remote event. Times are expressed in `tz`.
pub fn remote_to_event(remote: &RemoteEvent, tz: Tz) -> NewEvent {
    let title = if remote.title.trim().is_empty() {
        UNTITLED.to_string()
    } else {
        remote.title.clone()
    };

    let (date, start_time, end_time) = match (remote.start, remote.end) {
        (EventTime::Date(d), _) => (d, None, None),
        (EventTime::DateTime(s), end) => {
            let local_start = s.with_timezone(&tz);
            let local_end = end.instant_in(tz).with_timezone(&tz);
            (
                local_start.date_naive(),
                Some(local_start.time()),
                Some(local_end.time()),
            )
        }
    };

    NewEvent {
        title,
        date,
        all_day: remote.all_day(),
        start_time,
        end_time,
        description: remote.description.clone(),
        linked_task_id: remote.external_task_ref.clone(),
        external_event_id: remote.id.clone(),
    }
}

/// Due date a linked task takes from its remote event: the start instant,
/// with all-day events starting at local midnight.
pub fn remote_due_date(remote: &RemoteEvent, tz: Tz) -> DateTime<Utc> {
    remote.start.instant_in(tz)
}
