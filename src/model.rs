//! Board entities and the wire shapes the REST API returns for them.
//!
//! Raw payloads are deserialized into the `Raw*` structs, which accept every
//! shape the server has been seen to send (absent, `null`, bare id string or
//! populated object). `RawTask::normalize` and friends are the only place
//! those shapes are interpreted.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

pub const COLUMN_ORDER: [Status; 4] = [
    Status::Todo,
    Status::InProgress,
    Status::Done,
    Status::Blocked,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "todo")]
    Todo,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
    #[serde(rename = "blocked")]
    Blocked,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in-progress",
            Status::Done => "done",
            Status::Blocked => "blocked",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Status::Todo => "To Do",
            Status::InProgress => "In Progress",
            Status::Done => "Done",
            Status::Blocked => "Blocked",
        }
    }

    pub fn parse(value: &str) -> Option<Status> {
        COLUMN_ORDER.into_iter().find(|s| s.as_str() == value)
    }

    /// Terminal columns can only be left by an administrator.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Done | Status::Blocked)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Pm,
    Member,
}

impl Role {
    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "admin" => Some(Role::Admin),
            "pm" => Some(Role::Pm),
            "member" => Some(Role::Member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub id: String,
    pub title: String,
}

/// Entry of the `/users` listing. Unknown roles are kept as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub status: Status,
    pub assignee: Option<UserRef>,
    pub due_date: Option<Date>,
    pub project: Option<ProjectRef>,
    pub comments_count: u32,
    pub has_unread_comments: bool,
}

impl Task {
    pub fn is_assigned_to(&self, user_id: &str) -> bool {
        self.assignee.as_ref().is_some_and(|a| a.id == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub task_id: String,
    pub author: Option<UserRef>,
    pub content: String,
    pub created_at: Option<OffsetDateTime>,
}

pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

/// Accepts `YYYY-MM-DD` as well as a full timestamp, keeping only the date.
pub fn parse_date(value: &str) -> Option<Date> {
    let day = value.trim().get(..10)?;
    Date::parse(day, format_description!("[year]-[month]-[day]")).ok()
}

/// A reference field as sent by the server: either populated or a bare id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawRef {
    Id(String),
    Object {
        #[serde(rename = "_id")]
        id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
}

impl RawRef {
    fn into_parts(self) -> (String, String) {
        match self {
            RawRef::Id(id) => (id, String::new()),
            RawRef::Object { id, name, title } => (id, name.or(title).unwrap_or_default()),
        }
    }

    pub fn into_user(self) -> UserRef {
        let (id, name) = self.into_parts();
        UserRef { id, name }
    }

    pub fn into_project(self) -> ProjectRef {
        let (id, title) = self.into_parts();
        ProjectRef { id, title }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTask {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assignee: Option<RawRef>,
    #[serde(default)]
    pub project: Option<RawRef>,
    #[serde(default, rename = "dueDate")]
    pub due_date: Option<String>,
    #[serde(default, rename = "commentsCount")]
    pub comments_count: Option<u32>,
    #[serde(default, rename = "hasUnreadComments")]
    pub has_unread_comments: Option<bool>,
}

impl RawTask {
    /// Unrecognized or missing statuses land in `todo`.
    pub fn normalize(self) -> Task {
        let status = self
            .status
            .as_deref()
            .and_then(Status::parse)
            .unwrap_or(Status::Todo);
        Task {
            id: self.id,
            title: self.title.unwrap_or_default(),
            status,
            assignee: self.assignee.map(RawRef::into_user),
            due_date: self.due_date.as_deref().and_then(parse_date),
            project: self.project.map(RawRef::into_project),
            comments_count: self.comments_count.unwrap_or(0),
            has_unread_comments: self.has_unread_comments.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl RawUser {
    pub fn normalize(self) -> User {
        User {
            id: self.id,
            name: self.name.unwrap_or_default(),
            role: self.role.as_deref().and_then(Role::parse),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawProject {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl RawProject {
    pub fn normalize(self) -> ProjectRef {
        ProjectRef {
            id: self.id,
            title: self.title.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawComment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub author: Option<RawRef>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<String>,
}

impl RawComment {
    pub fn normalize(self, task_id: &str) -> Comment {
        Comment {
            id: self.id,
            task_id: task_id.to_string(),
            author: self.author.map(RawRef::into_user),
            content: self.content.unwrap_or_default(),
            created_at: self
                .created_at
                .as_deref()
                .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok()),
        }
    }
}
