//! Tests for google_event module.

#[cfg(test)]
mod tests {
    use super::super::google_event::*;
    use crate::error::SyncError;
    use crate::sync::types::{EventTime, RemoteEvent};
    use chrono::{NaiveDate, TimeZone, Utc};
    use chrono_tz::Tz;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<RemoteEvent, SyncError> {
        serde_json::from_value::<GoogleEvent>(value)
            .unwrap()
            .into_remote("fbTaskId")
    }

    #[test]
    fn timed_event_with_task_reference() {
        let remote = parse(json!({
            "id": "g1",
            "summary": "Standup",
            "start": { "dateTime": "2024-01-10T03:00:00-06:00", "timeZone": "America/Mexico_City" },
            "end": { "dateTime": "2024-01-10T09:30:00Z" },
            "extendedProperties": { "private": { "fbTaskId": "t1", "other": "x" } }
        }))
        .unwrap();

        assert_eq!(remote.id.as_deref(), Some("g1"));
        assert_eq!(remote.title, "Standup");
        assert_eq!(
            remote.start,
            EventTime::DateTime(Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap())
        );
        assert_eq!(remote.external_task_ref.as_deref(), Some("t1"));
        assert!(!remote.all_day());
    }

    #[test]
    fn all_day_end_is_converted_to_inclusive() {
        let remote = parse(json!({
            "id": "g2",
            "summary": "Offsite",
            "start": { "date": "2024-01-10" },
            "end": { "date": "2024-01-12" }
        }))
        .unwrap();

        assert!(remote.all_day());
        assert_eq!(remote.start, EventTime::Date(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()));
        assert_eq!(remote.end, EventTime::Date(NaiveDate::from_ymd_opt(2024, 1, 11).unwrap()));
    }

    #[test]
    fn all_day_end_not_after_start_becomes_one_day() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        for end in ["2024-01-10", "2024-01-08"] {
            let remote = parse(json!({
                "id": "g3",
                "summary": "Holiday",
                "start": { "date": "2024-01-10" },
                "end": { "date": end }
            }))
            .unwrap();
            assert_eq!(remote.start, EventTime::Date(day));
            assert_eq!(remote.end, EventTime::Date(day));
        }
    }

    #[test]
    fn missing_summary_and_empty_reference_are_defaulted() {
        let remote = parse(json!({
            "id": "g3",
            "start": { "date": "2024-01-10" },
            "end": { "date": "2024-01-11" },
            "extendedProperties": { "private": { "fbTaskId": "" } }
        }))
        .unwrap();

        assert_eq!(remote.title, "");
        assert!(remote.external_task_ref.is_none());
    }

    #[test]
    fn missing_or_bad_boundaries_are_rejected() {
        assert!(matches!(
            parse(json!({ "id": "g4", "start": { "date": "2024-01-10" } })),
            Err(SyncError::Mapping(_))
        ));
        assert!(matches!(
            parse(json!({
                "id": "g5",
                "start": { "dateTime": "yesterday" },
                "end": { "dateTime": "2024-01-10T09:30:00Z" }
            })),
            Err(SyncError::Mapping(_))
        ));
        assert!(matches!(
            parse(json!({ "id": "g6", "start": {}, "end": {} })),
            Err(SyncError::Mapping(_))
        ));
    }

    #[test]
    fn write_form_for_timed_event() {
        let tz: Tz = "America/Mexico_City".parse().unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap();
        let remote = RemoteEvent {
            id: Some("g1".into()),
            title: "Review".into(),
            description: None,
            start: EventTime::DateTime(start),
            end: EventTime::DateTime(start + chrono::Duration::minutes(30)),
            external_task_ref: Some("t1".into()),
        };

        let body = serde_json::to_value(GoogleEvent::from_remote(&remote, tz, "fbTaskId")).unwrap();
        assert_eq!(
            body,
            json!({
                "summary": "Review",
                "start": { "dateTime": "2024-01-10T09:00:00-06:00", "timeZone": "America/Mexico_City" },
                "end": { "dateTime": "2024-01-10T09:30:00-06:00", "timeZone": "America/Mexico_City" },
                "extendedProperties": { "private": { "fbTaskId": "t1" } }
            })
        );
    }

    #[test]
    fn write_form_for_all_day_event_has_exclusive_end() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let remote = RemoteEvent {
            id: None,
            title: "Holiday".into(),
            description: Some("Office closed".into()),
            start: EventTime::Date(day),
            end: EventTime::Date(day),
            external_task_ref: None,
        };

        let body = serde_json::to_value(GoogleEvent::from_remote(&remote, chrono_tz::UTC, "fbTaskId"))
            .unwrap();
        assert_eq!(body["start"], json!({ "date": "2024-01-10" }));
        assert_eq!(body["end"], json!({ "date": "2024-01-11" }));
        assert_eq!(body["description"], "Office closed");
        assert!(body.get("extendedProperties").is_none());
    }

    #[test]
    fn write_then_read_preserves_fields() {
        let tz: Tz = "Asia/Tokyo".parse().unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let remote = RemoteEvent {
            id: None,
            title: "Trip".into(),
            description: None,
            start: EventTime::Date(day),
            end: EventTime::Date(day.succ_opt().unwrap()),
            external_task_ref: Some("t9".into()),
        };

        let mut wire = GoogleEvent::from_remote(&remote, tz, "ref");
        wire.id = Some("g9".into());
        let back = wire.into_remote("ref").unwrap();
        assert_eq!(back.start, remote.start);
        assert_eq!(back.end, remote.end);
        assert_eq!(back.external_task_ref, remote.external_task_ref);
    }

    #[test]
    fn cancelled_status_is_detected() {
        let event: GoogleEvent =
            serde_json::from_value(json!({ "id": "g1", "status": "cancelled" })).unwrap();
        assert!(event.is_cancelled());
    }
}
