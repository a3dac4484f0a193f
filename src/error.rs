//! Error types for board operations.
//!
//! The `Display` text of every variant is meant to be shown to the user as-is.

use thiserror::Error;

use crate::model::Status;

/// Failures talking to the REST API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// Errors surfaced by [`crate::BoardStateManager`].
#[derive(Error, Debug)]
pub enum BoardError {
    #[error("task title cannot be empty")]
    EmptyTitle,

    #[error("comment cannot be empty")]
    EmptyComment,

    #[error("please set a due date for the task before assigning it to a user")]
    DueDateRequired { task_id: String },

    #[error("please assign an owner to this task before moving it to In Progress")]
    AssigneeRequired { task_id: String },

    #[error("task {task_id} is not in the {column} column")]
    NotInColumn { task_id: String, column: Status },

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("no edit in progress")]
    NoEditInProgress,

    #[error("only an administrator can move tasks out of the {} state", .0.as_str().to_uppercase())]
    AdminOnlyReopen(Status),

    #[error("not allowed: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Coarse classification of failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any request: bad input or stale UI state.
    Validation,
    /// Rejected before any request: role or status guard.
    Permission,
    /// Sent, but the server or the network failed.
    Network,
}

impl BoardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BoardError::EmptyTitle
            | BoardError::EmptyComment
            | BoardError::DueDateRequired { .. }
            | BoardError::NotInColumn { .. }
            | BoardError::TaskNotFound(_)
            | BoardError::NoEditInProgress => ErrorKind::Validation,
            BoardError::AssigneeRequired { .. }
            | BoardError::AdminOnlyReopen(_)
            | BoardError::Forbidden(_) => ErrorKind::Permission,
            BoardError::Api(_) => ErrorKind::Network,
        }
    }
}

/// Result type for board operations.
pub type Result<T> = std::result::Result<T, BoardError>;
