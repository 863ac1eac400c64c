//! TOML-based application configuration.
//!
//! Stores the settings the calendar sync needs:
//! - Google Calendar API endpoint and the private metadata key used for
//!   the task reference
//! - The time zone timed events are written in
//! - The pull window and the length of task-derived remote events
//!
//! Configuration is stored at `~/.config/focusboard/config.toml`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::sync::types::TimeWindow;

/// Google Calendar settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// IANA zone name timed events are written in.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// Key under `extendedProperties.private` holding the local task id.
    #[serde(default = "default_task_ref_key")]
    pub task_ref_key: String,
    /// Summary used when looking up or creating the dedicated calendar.
    #[serde(default = "default_calendar_name")]
    pub calendar_name: String,
}

/// Sync engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Length of the remote event created for a task's due date.
    #[serde(default = "default_task_event_minutes")]
    pub task_event_minutes: u32,
    /// Pull starts this many days before now.
    #[serde(default)]
    pub lookback_days: u32,
    /// Pull stops this many days after now; unbounded when unset.
    ///
    /// Kept as `null` in the dotted-key tree so `set` can reach it; TOML
    /// output omits it while unset.
    #[serde(default)]
    pub lookahead_days: Option<u32>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focusboard/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

fn default_api_base_url() -> String {
    "https://www.googleapis.com/calendar/v3".into()
}
fn default_time_zone() -> String {
    "America/Mexico_City".into()
}
fn default_task_ref_key() -> String {
    "fbTaskId".into()
}
fn default_calendar_name() -> String {
    "FocusBoard".into()
}
fn default_task_event_minutes() -> u32 {
    30
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            time_zone: default_time_zone(),
            task_ref_key: default_task_ref_key(),
            calendar_name: default_calendar_name(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            task_event_minutes: default_task_event_minutes(),
            lookback_days: 0,
            lookahead_days: None,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    // Clearing; only optional fields deserialize from null.
                    serde_json::Value::Number(_) if value.is_empty() || value == "none" => {
                        serde_json::Value::Null
                    }
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    // Unset optional field: take whatever the text looks like.
                    serde_json::Value::Null => match value.parse::<u64>() {
                        Ok(n) => serde_json::Value::Number(n.into()),
                        Err(_) if value.is_empty() || value == "none" => serde_json::Value::Null,
                        Err(_) => serde_json::Value::String(value.into()),
                    },
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some(String::new()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. The caller persists with [`Config::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result fails validation.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Flattened `key = value` pairs, for listing.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                serde_json::Value::Null => out.push((prefix.to_string(), String::new())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.time_zone()?;
        url::Url::parse(&self.google.api_base_url).map_err(|e| ConfigError::InvalidValue {
            key: "google.api_base_url".into(),
            message: e.to_string(),
        })?;
        if self.google.task_ref_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "google.task_ref_key".into(),
                message: "must not be empty".into(),
            });
        }
        if self.sync.task_event_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sync.task_event_minutes".into(),
                message: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Zone timed events are written in.
    pub fn time_zone(&self) -> Result<Tz, ConfigError> {
        self.google
            .time_zone
            .parse::<Tz>()
            .map_err(|e| ConfigError::InvalidValue {
                key: "google.time_zone".into(),
                message: e.to_string(),
            })
    }

    /// Length of the remote event created for a task's due date.
    pub fn task_event_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.sync.task_event_minutes))
    }

    /// Pull window relative to `now`.
    pub fn pull_window(&self, now: DateTime<Utc>) -> TimeWindow {
        TimeWindow {
            time_min: Some(now - Duration::days(i64::from(self.sync.lookback_days))),
            time_max: self
                .sync
                .lookahead_days
                .map(|d| now + Duration::days(i64::from(d))),
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
