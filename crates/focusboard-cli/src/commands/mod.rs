pub mod auth;
pub mod config;
pub mod event;
pub mod sync;
pub mod task;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use focusboard_core::sync::types::local_instant;
use focusboard_core::{CoreError, ValidationError};
use serde::Serialize;

/// Where command results go: JSON or plain text on stdout.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print `value` as pretty JSON, or run `text` to print it for humans.
    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T)) -> Result<(), CoreError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text(value);
        }
        Ok(())
    }
}

/// Parse `YYYY-MM-DD` (local midnight in `tz`) or an RFC 3339 timestamp.
pub fn parse_datetime(field: &str, raw: &str, tz: Tz) -> Result<DateTime<Utc>, ValidationError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(local_instant(tz, date, NaiveTime::MIN));
    }
    Err(ValidationError::InvalidValue {
        field: field.into(),
        message: format!("'{raw}' is neither YYYY-MM-DD nor an RFC 3339 timestamp"),
    })
}

pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidValue {
        field: field.into(),
        message: format!("'{raw}' is not a YYYY-MM-DD date"),
    })
}

pub fn parse_time(field: &str, raw: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|_| ValidationError::InvalidValue {
        field: field.into(),
        message: format!("'{raw}' is not an HH:MM time"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn datetime_accepts_date_or_timestamp() {
        let tz: Tz = "America/Mexico_City".parse().unwrap();
        assert_eq!(
            parse_datetime("due", "2024-01-10", tz).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 10, 6, 0, 0).unwrap()
        );
        assert_eq!(
            parse_datetime("due", "2024-01-10T09:00:00Z", tz).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()
        );
        assert!(parse_datetime("due", "tomorrow", tz).is_err());
    }

    #[test]
    fn time_is_hours_and_minutes() {
        assert_eq!(
            parse_time("start", "09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(parse_time("start", "9am").is_err());
    }
}
