//! Kanban board tasks.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Column a task sits in on the board.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Backlog,
    #[default]
    Todo,
    #[serde(rename = "inprogress")]
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Backlog,
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Backlog => "backlog",
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "inprogress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "backlog" => Ok(TaskStatus::Backlog),
            "todo" => Ok(TaskStatus::Todo),
            "inprogress" | "in_progress" | "in-progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(ValidationError::InvalidValue {
                field: "status".into(),
                message: format!("unknown status '{other}' (expected backlog, todo, inprogress, done)"),
            }),
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            other => Err(ValidationError::InvalidValue {
                field: "priority".into(),
                message: format!("unknown priority '{other}' (expected low, medium, high)"),
            }),
        }
    }
}

/// A task on the board.
///
/// Pull may overwrite `title` and `due_date` when the task is linked to a
/// remote event; every other field is only changed by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalTask {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task. Id and timestamps are assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub tags: BTreeSet<String>,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title".into()));
        }
        Ok(())
    }
}

/// Partial update applied by [`crate::storage::Database::update_task`].
///
/// `Some(None)` on a nullable field clears it.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub tags: Option<BTreeSet<String>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub(crate) fn apply(self, task: &mut LocalTask) -> Result<(), ValidationError> {
        if let Some(title) = self.title {
            if title.trim().is_empty() {
                return Err(ValidationError::MissingField("title".into()));
            }
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(tags) = self.tags {
            task.tags = tags;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        Ok(())
    }
}

/// Board filter: free text over title/description, any-of tags, priority.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub search_text: String,
    pub tags: BTreeSet<String>,
    pub priority: Option<TaskPriority>,
}

impl TaskFilter {
    pub fn matches(&self, task: &LocalTask) -> bool {
        let needle = self.search_text.to_lowercase();
        let matches_search = needle.is_empty()
            || task.title.to_lowercase().contains(&needle)
            || task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));

        let matches_tags = self.tags.is_empty() || self.tags.iter().any(|t| task.tags.contains(t));
        let matches_priority = self.priority.map_or(true, |p| p == task.priority);

        matches_search && matches_tags && matches_priority
    }
}

/// Parse a comma-separated tag list, dropping blanks.
pub fn parse_tags(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
