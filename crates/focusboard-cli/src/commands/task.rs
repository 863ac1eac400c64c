//! Task management commands for CLI.

use clap::Subcommand;
use focusboard_core::model::parse_tags;
use focusboard_core::{
    Config, CoreError, Database, LocalTask, NewTask, TaskFilter, TaskPatch, TaskPriority,
    TaskStatus, ValidationError,
};

use super::{parse_datetime, Output};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
        /// Task description
        #[arg(long)]
        description: Option<String>,
        /// Priority: low, medium or high (default: medium)
        #[arg(long)]
        priority: Option<TaskPriority>,
        /// Column: backlog, todo, inprogress or done (default: todo)
        #[arg(long)]
        status: Option<TaskStatus>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,
    },
    /// List tasks
    List {
        /// Only this column
        #[arg(long)]
        status: Option<TaskStatus>,
        /// Text to search in title and description
        #[arg(long)]
        search: Option<String>,
        /// Comma-separated tags; any match
        #[arg(long)]
        tags: Option<String>,
        /// Only this priority
        #[arg(long)]
        priority: Option<TaskPriority>,
    },
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// Update a task
    Update {
        /// Task ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New priority
        #[arg(long)]
        priority: Option<TaskPriority>,
        /// Comma-separated tags (replaces existing)
        #[arg(long)]
        tags: Option<String>,
        /// New due date (YYYY-MM-DD or RFC 3339)
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },
    /// Move a task to another column
    Move {
        /// Task ID
        id: String,
        /// Target column
        status: TaskStatus,
    },
    /// Copy a task
    Duplicate {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
}

fn print_task(task: &LocalTask) {
    println!("{}  [{}] {}", task.id, task.status, task.title);
    println!("  priority: {}", task.priority);
    if let Some(description) = &task.description {
        println!("  description: {description}");
    }
    if !task.tags.is_empty() {
        let tags: Vec<&str> = task.tags.iter().map(String::as_str).collect();
        println!("  tags: {}", tags.join(", "));
    }
    if let Some(due) = task.due_date {
        println!("  due: {}", due.to_rfc3339());
    }
}

fn not_found(id: &str) -> CoreError {
    ValidationError::UnknownEntity {
        kind: "task".into(),
        id: id.into(),
    }
    .into()
}

pub fn run(action: TaskAction, out: Output) -> Result<(), CoreError> {
    let db = Database::open()?;

    match action {
        TaskAction::Add {
            title,
            description,
            priority,
            status,
            tags,
            due,
        } => {
            let due_date = match due {
                Some(raw) => Some(parse_datetime("due", &raw, Config::load()?.time_zone()?)?),
                None => None,
            };
            let task = db.add_task(NewTask {
                title,
                description,
                status: status.unwrap_or_default(),
                priority: priority.unwrap_or_default(),
                tags: tags.as_deref().map(parse_tags).unwrap_or_default(),
                due_date,
            })?;
            out.emit(&task, |t| {
                println!("Task created:");
                print_task(t);
            })?;
        }
        TaskAction::List {
            status,
            search,
            tags,
            priority,
        } => {
            let filter = TaskFilter {
                search_text: search.unwrap_or_default(),
                tags: tags.as_deref().map(parse_tags).unwrap_or_default(),
                priority,
            };
            let tasks: Vec<LocalTask> = db
                .filter_tasks(&filter)?
                .into_iter()
                .filter(|t| status.map_or(true, |s| t.status == s))
                .collect();
            out.emit(&tasks, |tasks| {
                if tasks.is_empty() {
                    println!("No tasks");
                }
                for status in TaskStatus::ALL {
                    let column: Vec<_> = tasks.iter().filter(|t| t.status == status).collect();
                    if column.is_empty() {
                        continue;
                    }
                    println!("{status} ({})", column.len());
                    for t in column {
                        println!("  {}  {}", t.id, t.title);
                    }
                }
            })?;
        }
        TaskAction::Get { id } => {
            let task = db.get_task(&id)?.ok_or_else(|| not_found(&id))?;
            out.emit(&task, print_task)?;
        }
        TaskAction::Update {
            id,
            title,
            description,
            priority,
            tags,
            due,
            clear_due,
        } => {
            let due_date = match (due, clear_due) {
                (Some(raw), _) => Some(Some(parse_datetime(
                    "due",
                    &raw,
                    Config::load()?.time_zone()?,
                )?)),
                (None, true) => Some(None),
                (None, false) => None,
            };
            let patch = TaskPatch {
                title,
                description: description.map(Some),
                status: None,
                priority,
                tags: tags.as_deref().map(parse_tags),
                due_date,
            };
            let task = db.update_task(&id, patch)?;
            out.emit(&task, |t| {
                println!("Task updated:");
                print_task(t);
            })?;
        }
        TaskAction::Move { id, status } => {
            let task = db.move_task(&id, status)?;
            out.emit(&task, |t| println!("Moved {} to {}", t.id, t.status))?;
        }
        TaskAction::Duplicate { id } => {
            let task = db.duplicate_task(&id)?;
            out.emit(&task, |t| {
                println!("Task duplicated:");
                print_task(t);
            })?;
        }
        TaskAction::Delete { id } => {
            if !db.delete_task(&id)? {
                return Err(not_found(&id));
            }
            out.emit(&serde_json::json!({ "deleted": id }), |_| {
                println!("Task deleted: {id}");
            })?;
        }
    }
    Ok(())
}
