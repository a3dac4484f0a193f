//! The REST collaborator behind the board.
//!
//! One method per endpoint. Implementations return normalized entities; the
//! raw wire shapes never leave this layer.

use async_trait::async_trait;
use serde::Serialize;
use time::Date;

use crate::error::ApiError;
use crate::model::{format_date, Comment, ProjectRef, Status, Task, User, UserRef};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone, Serialize)]
pub struct NewTask {
    pub title: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

/// Partial update; absent fields are left alone by the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// `Some(None)` clears the due date.
    #[serde(
        rename = "dueDate",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_due_date"
    )]
    pub due_date: Option<Option<Date>>,
}

fn serialize_due_date<S>(value: &Option<Option<Date>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(Some(date)) => serializer.serialize_str(&format_date(*date)),
        _ => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub status: Status,
}

#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    /// Empty string unassigns.
    #[serde(rename = "assigneeId")]
    pub assignee_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub content: String,
}

#[async_trait]
pub trait BoardApi: Send + Sync {
    /// `GET /tasks`, scoped server-side to what the caller may see.
    async fn list_tasks(&self) -> ApiResult<Vec<Task>>;

    /// `GET /users`
    async fn list_users(&self) -> ApiResult<Vec<User>>;

    /// `GET /projects`
    async fn list_projects(&self) -> ApiResult<Vec<ProjectRef>>;

    /// `POST /tasks`
    async fn create_task(&self, task: &NewTask) -> ApiResult<Task>;

    /// `PATCH /tasks/:id`. Only the status of the reply matters.
    async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> ApiResult<()>;

    /// `POST /tasks/:id/status`
    async fn set_status(&self, task_id: &str, change: &StatusChange) -> ApiResult<()>;

    /// `DELETE /tasks/:id`
    async fn delete_task(&self, task_id: &str) -> ApiResult<()>;

    /// `PUT /tasks/:id/assign`, returning the server's view of the assignee.
    async fn assign_task(&self, task_id: &str, assignment: &Assignment)
        -> ApiResult<Option<UserRef>>;

    /// `GET /tasks/:id/comments`
    async fn list_comments(&self, task_id: &str) -> ApiResult<Vec<Comment>>;

    /// `POST /tasks/:id/comments`
    async fn add_comment(&self, task_id: &str, comment: &NewComment) -> ApiResult<Comment>;
}
