//! Google Calendar sync commands for CLI.

use clap::Subcommand;
use focusboard_core::auth;
use focusboard_core::sync::{GoogleCalendarClient, SyncEngine, SyncService, TimeWindow};
use focusboard_core::{Config, CoreError, Database};
use tracing::debug;

use super::{parse_datetime, Output};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Pull remote events into the local calendar and board
    Pull {
        /// Window start (YYYY-MM-DD or RFC 3339); defaults to now minus lookback
        #[arg(long)]
        from: Option<String>,
        /// Window end (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        to: Option<String>,
    },
    /// Push due-dated tasks to the remote calendar
    Push,
    /// Pull, then push
    Cycle,
    /// Bind to an existing calendar by id
    Setup {
        /// Google Calendar id (e.g. "primary")
        calendar_id: String,
    },
    /// Bind to the calendar with this name, creating it if missing
    Ensure {
        /// Calendar name (default: google.calendar_name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Show connection status
    Status,
    /// Forget the bound calendar; local data is kept
    Disconnect,
    /// Delete a remote event by id
    Delete {
        /// Remote event id
        event_id: String,
    },
}

/// Build the service over the default database and configured client.
pub fn service<'a>(
    config: &Config,
    db: &'a Database,
) -> Result<SyncService<'a, GoogleCalendarClient>, CoreError> {
    debug!(base_url = %config.google.api_base_url, "building sync service");
    let client = GoogleCalendarClient::from_config(config, auth::access_token())?;
    let engine = SyncEngine::from_config(client, config)?;
    Ok(SyncService::new(engine, db))
}

pub async fn run(action: SyncAction, out: Output) -> Result<(), CoreError> {
    let config = Config::load()?;
    let db = Database::open()?;
    let service = service(&config, &db)?;

    match action {
        SyncAction::Pull { from, to } => {
            let summary = if from.is_none() && to.is_none() {
                service.pull().await?
            } else {
                let tz = config.time_zone()?;
                let window = TimeWindow {
                    time_min: from.map(|f| parse_datetime("from", &f, tz)).transpose()?,
                    time_max: to.map(|t| parse_datetime("to", &t, tz)).transpose()?,
                };
                service.pull_window(window).await?
            };
            out.emit(&summary, |s| {
                println!(
                    "Pulled {} remote events: {} tasks updated, {} events added, {} skipped",
                    s.count, s.tasks_updated, s.events_inserted, s.skipped
                );
            })?;
        }
        SyncAction::Push => {
            let summary = service.push().await?;
            out.emit(&summary, |s| {
                println!(
                    "Pushed tasks: {} created, {} updated, {} unchanged",
                    s.created, s.updated, s.unchanged
                );
            })?;
        }
        SyncAction::Cycle => {
            let report = service.cycle().await?;
            out.emit(&report, |r| {
                println!(
                    "Pulled {} remote events ({} tasks updated, {} events added)",
                    r.pull.count, r.pull.tasks_updated, r.pull.events_inserted
                );
                match (&r.push, &r.push_error) {
                    (Some(p), _) => println!(
                        "Pushed tasks: {} created, {} updated, {} unchanged",
                        p.created, p.updated, p.unchanged
                    ),
                    (None, Some(e)) => println!("Push failed: {e}"),
                    (None, None) => {}
                }
            })?;
        }
        SyncAction::Setup { calendar_id } => {
            let result = service.setup(&calendar_id).await?;
            out.emit(&result, |r| {
                println!("Connected to \"{}\" ({})", r.calendar_name, r.calendar_id);
            })?;
        }
        SyncAction::Ensure { name } => {
            let name = name.unwrap_or_else(|| config.google.calendar_name.clone());
            let result = service.ensure_calendar(&name).await?;
            out.emit(&result, |r| {
                println!("Connected to \"{}\" ({})", r.calendar_name, r.calendar_id);
            })?;
        }
        SyncAction::Status => {
            let status = service.status()?;
            out.emit(&status, |s| {
                println!("Authenticated: {}", if s.authenticated { "yes" } else { "no" });
                println!("Calendar:      {}", s.calendar_id.as_deref().unwrap_or("-"));
                match s.last_sync_at {
                    Some(at) => println!("Last sync:     {}", at.to_rfc3339()),
                    None => println!("Last sync:     never"),
                }
            })?;
        }
        SyncAction::Disconnect => {
            service.disconnect()?;
            out.emit(&serde_json::json!({ "success": true }), |_| {
                println!("Disconnected");
            })?;
        }
        SyncAction::Delete { event_id } => {
            service.delete_remote_event(&event_id).await?;
            out.emit(&serde_json::json!({ "success": true }), |_| {
                println!("Deleted remote event {event_id}");
            })?;
        }
    }
    Ok(())
}
