use clap::Subcommand;
use focusboard_core::{Config, ConfigError, CoreError};

use super::Output;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "google.time_zone", "sync.task_event_minutes")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction, out: Output) -> Result<(), CoreError> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key).ok_or(ConfigError::UnknownKey(key))?;
            out.emit(&value, |v| println!("{v}"))?;
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            let stored = config.get(&key).unwrap_or(value);
            out.emit(&serde_json::json!({ "key": key, "value": stored }), |_| {
                println!("ok");
            })?;
        }
        ConfigAction::List => {
            let config = Config::load()?;
            out.emit(&config, |c| {
                for (key, value) in c.entries() {
                    println!("{key} = {value}");
                }
            })?;
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            out.emit(&config, |_| println!("config reset to defaults"))?;
        }
    }
    Ok(())
}
