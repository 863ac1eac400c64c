//! Tests for types module.

#[cfg(test)]
mod tests {
    use super::super::types::*;
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use chrono_tz::Tz;

    #[test]
    fn date_boundary_resolves_to_local_midnight() {
        let tz: Tz = "Asia/Tokyo".parse().unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(
            EventTime::Date(day).instant_in(tz),
            Utc.with_ymd_and_hms(2024, 1, 9, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn instant_date_depends_on_zone() {
        let at = EventTime::DateTime(Utc.with_ymd_and_hms(2024, 1, 10, 3, 0, 0).unwrap());
        let mexico: Tz = "America/Mexico_City".parse().unwrap();
        assert_eq!(at.date_in(mexico), NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        assert_eq!(at.date_in(chrono_tz::UTC), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }

    #[test]
    fn skipped_local_time_still_resolves() {
        // 02:30 does not exist in New York on 2024-03-10.
        let tz: Tz = "America/New_York".parse().unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let at = local_instant(tz, day, NaiveTime::from_hms_opt(2, 30, 0).unwrap());
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 3, 10, 7, 30, 0).unwrap());
        let local = at.with_timezone(&tz);
        assert_eq!(local.date_naive(), day);
        assert_eq!(local.time(), NaiveTime::from_hms_opt(3, 30, 0).unwrap());
    }

    #[test]
    fn repeated_local_time_takes_earlier_instant() {
        // 01:30 happens twice in New York on 2024-11-03; EDT comes first.
        let tz: Tz = "America/New_York".parse().unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 11, 3).unwrap();
        let at = local_instant(tz, day, NaiveTime::from_hms_opt(1, 30, 0).unwrap());
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap());
    }

    #[test]
    fn summaries_serialize_camel_case() {
        let summary = PullSummary {
            count: 3,
            tasks_updated: 1,
            events_inserted: 2,
            skipped: 0,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["tasksUpdated"], 1);
        assert_eq!(json["eventsInserted"], 2);

        let status = RemoteStatus::default();
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["authenticated"], false);
        assert!(json.get("calendarId").is_none());
    }

    #[test]
    fn phase_defaults_to_idle() {
        assert_eq!(SyncPhase::default(), SyncPhase::Idle);
        assert_eq!(serde_json::to_string(&SyncPhase::Pulling).unwrap(), "\"pulling\"");
    }
}
