//! Local domain types owned by the task board and the calendar.

pub mod event;
pub mod task;

pub use event::{EventPatch, LocalEvent, NewEvent};
pub use task::{parse_tags, LocalTask, NewTask, TaskFilter, TaskPatch, TaskPriority, TaskStatus};
