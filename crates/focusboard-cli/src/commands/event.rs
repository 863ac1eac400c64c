//! Local calendar commands for CLI.

use chrono::{Local, NaiveTime};
use clap::Subcommand;
use focusboard_core::{Config, CoreError, Database, LocalEvent, NewEvent, ValidationError};

use super::{parse_date, parse_time, Output};

#[derive(Subcommand)]
pub enum EventAction {
    /// Add an event; all-day unless --start is given
    Add {
        /// Event title
        title: String,
        /// Day (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Start time (HH:MM)
        #[arg(long)]
        start: Option<String>,
        /// End time (HH:MM)
        #[arg(long, requires = "start")]
        end: Option<String>,
        /// Event description
        #[arg(long)]
        description: Option<String>,
        /// Link the event to a board task
        #[arg(long)]
        task: Option<String>,
    },
    /// List events
    List {
        /// Only this day (YYYY-MM-DD)
        #[arg(long, conflicts_with_all = ["from", "to"])]
        date: Option<String>,
        /// First day (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// Last day (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<String>,
    },
    /// Delete a local event
    Delete {
        /// Event ID
        id: String,
    },
    /// Copy a local event to the remote calendar
    Export {
        /// Event ID
        id: String,
    },
}

fn format_time(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string()).unwrap_or_default()
}

fn print_event(event: &LocalEvent) {
    let when = if event.all_day {
        "all day".to_string()
    } else {
        format!("{}-{}", format_time(event.start_time), format_time(event.end_time))
    };
    println!("{}  {} {}  {}", event.id, event.date, when, event.title);
    if let Some(description) = &event.description {
        println!("  {description}");
    }
    if let Some(task) = &event.linked_task_id {
        println!("  task: {task}");
    }
}

pub async fn run(action: EventAction, out: Output) -> Result<(), CoreError> {
    let db = Database::open()?;

    match action {
        EventAction::Add {
            title,
            date,
            start,
            end,
            description,
            task,
        } => {
            let date = match date {
                Some(raw) => parse_date("date", &raw)?,
                None => Local::now().date_naive(),
            };
            if let Some(task_id) = &task {
                if db.get_task(task_id)?.is_none() {
                    return Err(ValidationError::UnknownEntity {
                        kind: "task".into(),
                        id: task_id.clone(),
                    }
                    .into());
                }
            }
            let mut new = match start {
                Some(start) => {
                    let start = parse_time("start", &start)?;
                    let end = match end {
                        Some(end) => parse_time("end", &end)?,
                        None => start + chrono::Duration::hours(1),
                    };
                    NewEvent::timed(title, date, start, end)
                }
                None => NewEvent::all_day(title, date),
            };
            new.description = description;
            new.linked_task_id = task;
            let event = db.add_event(new)?;
            out.emit(&event, |e| {
                println!("Event created:");
                print_event(e);
            })?;
        }
        EventAction::List { date, from, to } => {
            let events = match (date, from, to) {
                (Some(day), _, _) => db.events_on(parse_date("date", &day)?)?,
                (None, Some(from), Some(to)) => {
                    db.events_between(parse_date("from", &from)?, parse_date("to", &to)?)?
                }
                _ => db.list_events()?,
            };
            out.emit(&events, |events| {
                if events.is_empty() {
                    println!("No events");
                }
                for e in events {
                    print_event(e);
                }
            })?;
        }
        EventAction::Delete { id } => {
            if !db.delete_event(&id)? {
                return Err(ValidationError::UnknownEntity {
                    kind: "event".into(),
                    id,
                }
                .into());
            }
            out.emit(&serde_json::json!({ "deleted": id }), |_| {
                println!("Event deleted: {id}");
            })?;
        }
        EventAction::Export { id } => {
            let config = Config::load()?;
            let service = super::sync::service(&config, &db)?;
            let outcome = service.export_event(&id).await?;
            out.emit(&outcome, |o| {
                let verb = if o.created { "Created" } else { "Updated" };
                println!("{verb} remote event {}", o.id);
            })?;
        }
    }
    Ok(())
}
