//! Task business logic - organizer to-do items with deadlines.

use super::validation::{Check, Form, Rule, parse_timestamp, validate};
use crate::{
    auth::Session,
    errors::{Error, Result},
    models::{Record, Task, Timestamp, records_from_snapshot},
    store::{Collection, Direction, DocumentStore, Fields, Query},
};
use serde_json::Value;
use tracing::info;

/// Raw input of the add-task form.
#[derive(Debug, Clone, Default)]
pub struct TaskForm {
    /// What needs doing
    pub title: String,
    /// Deadline, RFC 3339
    pub deadline: String,
}

impl Form for TaskForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "title" => Some(&self.title),
            "deadline" => Some(&self.deadline),
            _ => None,
        }
    }
}

const TASK_RULES: &[Rule] = &[
    Rule::new("title", Check::Required, "Title and deadline are required."),
    Rule::new("deadline", Check::Required, "Title and deadline are required."),
    Rule::new("deadline", Check::Timestamp, "Please pick a valid deadline."),
];

/// Adds an open task to `event_id`. The deadline is stored as a timestamp.
pub async fn add_task<S: DocumentStore>(
    store: &S,
    session: &Session,
    event_id: &str,
    form: &TaskForm,
) -> Result<Task> {
    session.require_user()?;
    validate(form, TASK_RULES)?;
    let deadline = parse_timestamp(&form.deadline)
        .ok_or_else(|| Error::validation("deadline", "Please pick a valid deadline."))?;

    let mut task = Task {
        id: String::new(),
        event_id: event_id.to_string(),
        title: form.title.trim().to_string(),
        deadline: Timestamp::from(deadline),
        is_completed: false,
    };
    task.id = store
        .add_document(Collection::Tasks, task.to_fields()?)
        .await?;
    info!(%event_id, task_id = %task.id, "Task added");
    Ok(task)
}

/// Sets the completion flag of a task.
pub async fn set_task_completed<S: DocumentStore>(
    store: &S,
    session: &Session,
    task_id: &str,
    is_completed: bool,
) -> Result<()> {
    session.require_user()?;
    let mut fields = Fields::new();
    fields.insert("isCompleted".to_string(), Value::Bool(is_completed));
    store
        .update_document(Collection::Tasks, task_id, fields)
        .await?;
    info!(%task_id, is_completed, "Task completion changed");
    Ok(())
}

/// Flips the completion flag and returns the new value.
pub async fn toggle_task<S: DocumentStore>(
    store: &S,
    session: &Session,
    task_id: &str,
) -> Result<bool> {
    session.require_user()?;
    let doc = store
        .get_document(Collection::Tasks, task_id)
        .await?
        .ok_or_else(|| Error::not_found("Task", task_id))?;
    let task = Task::from_document(&doc)?;

    let next = !task.is_completed;
    set_task_completed(store, session, task_id, next).await?;
    Ok(next)
}

/// Deletes a task.
pub async fn delete_task<S: DocumentStore>(
    store: &S,
    session: &Session,
    task_id: &str,
) -> Result<()> {
    session.require_user()?;
    store.delete_document(Collection::Tasks, task_id).await?;
    info!(%task_id, "Task deleted");
    Ok(())
}

/// Tasks of `event_id`, earliest deadline first.
pub async fn list_tasks<S: DocumentStore>(
    store: &S,
    session: &Session,
    event_id: &str,
) -> Result<Vec<Task>> {
    session.require_user()?;
    let query = Query::new()
        .eq("eventId", event_id)
        .order_by("deadline", Direction::Ascending);
    let docs = store.query(Collection::Tasks, &query).await?;
    Ok(records_from_snapshot(&docs))
}
