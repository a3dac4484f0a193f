//! Client-side state for a role-gated Kanban board backed by a REST API.
//!
//! [`BoardStateManager`] owns the four-column board, applies drag-and-drop
//! moves optimistically and resynchronizes from the server when a move is
//! rejected. All other mutations are applied only once the server accepts
//! them. The HTTP transport lives behind the [`BoardApi`] trait; [`HttpApi`]
//! is the reqwest implementation.

pub mod api;
pub mod board;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod manager;
pub mod model;
pub mod permissions;

pub use api::BoardApi;
pub use board::{Board, Column};
pub use config::ClientConfig;
pub use context::{BoardContext, Confirm, CurrentUser, PromptConfirm};
pub use error::{ApiError, BoardError, ErrorKind, Result};
pub use http::HttpApi;
pub use manager::{BoardStateManager, CommentThread, EditSession, MoveOutcome, StatusUpdate};
pub use model::{Comment, ProjectRef, Role, Status, Task, User, UserRef};
pub use permissions::Action;
