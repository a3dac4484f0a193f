//! Board state with optimistic moves.
//!
//! Moves are applied locally first and confirmed afterwards; a rejected
//! confirmation throws the local state away and reloads the whole board.
//! Every other mutation waits for the server before touching local state.

use std::collections::{HashMap, HashSet};

use time::Date;
use tracing::{debug, info, warn};

use crate::api::{Assignment, BoardApi, NewComment, NewTask, StatusChange, TaskPatch};
use crate::board::Board;
use crate::context::BoardContext;
use crate::error::{BoardError, Result};
use crate::model::{Comment, ProjectRef, Role, Status, Task, User, COLUMN_ORDER};
use crate::permissions::{self, Action, Actor};

const DELETE_PROMPT: &str = "Delete this task?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub task_id: String,
    pub draft: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentThread {
    pub task_id: String,
    pub comments: Vec<Comment>,
}

/// A cross-column move applied locally and not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub task_id: String,
    pub from: Status,
    pub to: Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Dropped where it was picked up.
    Unchanged,
    /// Same column, new position. Not persisted.
    Reordered,
    ColumnChanged(StatusUpdate),
}

pub struct BoardStateManager<A> {
    api: A,
    context: BoardContext,
    board: Board,
    users: Vec<User>,
    projects: Vec<ProjectRef>,
    selected_projects: HashMap<Status, String>,
    editing: Option<EditSession>,
    comments: Option<CommentThread>,
    filter_mine: bool,
    expanded: HashSet<String>,
}

impl<A: BoardApi> BoardStateManager<A> {
    pub fn new(api: A, context: BoardContext) -> Self {
        let filter_mine = context.user.role != Role::Admin;
        BoardStateManager {
            api,
            context,
            board: Board::default(),
            users: Vec::new(),
            projects: Vec::new(),
            selected_projects: HashMap::new(),
            editing: None,
            comments: None,
            filter_mine,
            expanded: HashSet::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn context(&self) -> &BoardContext {
        &self.context
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn is_editable(&self) -> bool {
        self.context.is_editable()
    }

    fn actor(&self) -> Actor<'_> {
        Actor {
            user: &self.context.user,
            editable: self.context.is_editable(),
        }
    }

    fn existing(&self, task_id: &str) -> Result<&Task> {
        self.board
            .task(task_id)
            .ok_or_else(|| BoardError::TaskNotFound(task_id.to_string()))
    }

    /// Whether `action` on `task_id` would pass the capability check right now.
    pub fn can(&self, action: Action, task_id: Option<&str>) -> bool {
        let task = task_id.and_then(|id| self.board.task(id));
        if task_id.is_some() && task.is_none() {
            return false;
        }
        permissions::check(self.actor(), action, task).is_ok()
    }

    /// Loads the board and, on editable boards, the user and project lists.
    pub async fn mount(&mut self) -> Result<()> {
        self.load_board().await?;
        if self.is_editable() {
            if let Err(err) = self.load_users().await {
                warn!(error = %err, "failed to fetch users");
            }
            if let Err(err) = self.load_projects().await {
                warn!(error = %err, "failed to fetch projects");
            }
        }
        Ok(())
    }

    /// Replaces the whole board with the server's listing.
    pub async fn load_board(&mut self) -> Result<&Board> {
        let tasks = self.api.list_tasks().await?;
        self.board = Board::from_tasks(tasks);
        debug!(tasks = self.board.len(), "board loaded");

        let board = &self.board;
        self.expanded.retain(|id| board.task(id).is_some());
        if self
            .editing
            .as_ref()
            .is_some_and(|e| board.task(&e.task_id).is_none())
        {
            self.editing = None;
        }
        if self
            .comments
            .as_ref()
            .is_some_and(|c| board.task(&c.task_id).is_none())
        {
            self.comments = None;
        }
        Ok(&self.board)
    }

    pub async fn load_users(&mut self) -> Result<&[User]> {
        self.users = self.api.list_users().await?;
        Ok(&self.users)
    }

    /// Every column's project selection is reset to the first project.
    pub async fn load_projects(&mut self) -> Result<&[ProjectRef]> {
        self.projects = self.api.list_projects().await?;
        if let Some(first) = self.projects.first() {
            for status in COLUMN_ORDER {
                self.selected_projects.insert(status, first.id.clone());
            }
        }
        Ok(&self.projects)
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Project managers may only hand tasks to team members.
    pub fn assignable_users(&self) -> Vec<&User> {
        self.users
            .iter()
            .filter(|u| self.context.user.role != Role::Pm || u.role == Some(Role::Member))
            .collect()
    }

    pub fn projects(&self) -> &[ProjectRef] {
        &self.projects
    }

    pub fn selected_project(&self, column: Status) -> Option<&str> {
        self.selected_projects.get(&column).map(String::as_str)
    }

    pub fn select_project(&mut self, column: Status, project_id: impl Into<String>) {
        self.selected_projects.insert(column, project_id.into());
    }

    pub fn filter_mine(&self) -> bool {
        self.filter_mine
    }

    pub fn set_filter_mine(&mut self, on: bool) {
        self.filter_mine = on;
    }

    /// Tasks of `column` as displayed, honouring the "my tasks" filter.
    pub fn visible_tasks(&self, column: Status) -> Vec<&Task> {
        let me = &self.context.user.id;
        self.board
            .column_tasks(column)
            .filter(|t| !self.filter_mine || t.is_assigned_to(me))
            .collect()
    }

    /// Returns the new expanded state.
    pub fn toggle_expand(&mut self, task_id: &str) -> bool {
        if self.expanded.remove(task_id) {
            false
        } else {
            self.expanded.insert(task_id.to_string());
            true
        }
    }

    pub fn is_expanded(&self, task_id: &str) -> bool {
        self.expanded.contains(task_id)
    }

    /// The optimistic half of a drag: guards, then the local rearrangement.
    ///
    /// Guards are evaluated against the pre-move state, in this order: a drop
    /// on the pickup position is a no-op, `in-progress` needs an assignee,
    /// leaving `done`/`blocked` needs an administrator.
    pub fn apply_move(
        &mut self,
        task_id: &str,
        from: Status,
        to: Status,
        to_index: usize,
    ) -> Result<MoveOutcome> {
        let task = self.existing(task_id)?;
        let from_index =
            self.board
                .column(from)
                .position(task_id)
                .ok_or_else(|| BoardError::NotInColumn {
                    task_id: task_id.to_string(),
                    column: from,
                })?;
        if from == to && from_index == to_index {
            return Ok(MoveOutcome::Unchanged);
        }
        permissions::check(self.actor(), Action::Move { to }, Some(task))?;

        self.board.move_task(from, from_index, to, to_index);
        if from == to {
            debug!(task_id, column = %from, to_index, "task reordered");
            return Ok(MoveOutcome::Reordered);
        }
        debug!(task_id, %from, %to, to_index, "task moved optimistically");
        Ok(MoveOutcome::ColumnChanged(StatusUpdate {
            task_id: task_id.to_string(),
            from,
            to,
        }))
    }

    /// Confirms an optimistic move. On rejection the board is reloaded from
    /// the server and the rejection is returned.
    pub async fn confirm_status_change(&mut self, update: &StatusUpdate) -> Result<()> {
        let change = StatusChange { status: update.to };
        match self.api.set_status(&update.task_id, &change).await {
            Ok(()) => {
                info!(task_id = %update.task_id, status = %update.to, "task status updated");
                self.context.notify_task_update();
                Ok(())
            }
            Err(err) => {
                warn!(task_id = %update.task_id, error = %err, "status update rejected, reloading board");
                if let Err(reload) = self.load_board().await {
                    warn!(error = %reload, "reload after rejected move failed");
                }
                Err(err.into())
            }
        }
    }

    /// Drag-and-drop: [`Self::apply_move`] then, for cross-column moves,
    /// [`Self::confirm_status_change`].
    pub async fn move_task(
        &mut self,
        task_id: &str,
        from: Status,
        to: Status,
        to_index: usize,
    ) -> Result<MoveOutcome> {
        let outcome = self.apply_move(task_id, from, to, to_index)?;
        if let MoveOutcome::ColumnChanged(update) = &outcome {
            self.confirm_status_change(update).await?;
        }
        Ok(outcome)
    }

    /// Creates a task at the top of `column`. Without an explicit project the
    /// column's selected project is used.
    pub async fn create_task(
        &mut self,
        column: Status,
        title: &str,
        project_id: Option<&str>,
    ) -> Result<&Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(BoardError::EmptyTitle);
        }
        permissions::check(self.actor(), Action::Create, None)?;

        let project = project_id
            .map(str::to_string)
            .or_else(|| self.selected_projects.get(&column).cloned());
        let request = NewTask {
            title: title.to_string(),
            status: column,
            project,
        };
        let mut task = self.api.create_task(&request).await?;
        task.assignee = None;
        task.comments_count = 0;
        task.has_unread_comments = false;
        let task_id = task.id.clone();
        self.board.insert_front(task, column);
        info!(task_id = %task_id, %column, "task created");
        self.context.notify_task_update();
        self.existing(&task_id)
    }

    /// Returns `Ok(false)` when the user declines the confirmation prompt.
    pub async fn delete_task(&mut self, task_id: &str, column: Status) -> Result<bool> {
        let task = self.existing(task_id)?;
        if self.board.column(column).position(task_id).is_none() {
            return Err(BoardError::NotInColumn {
                task_id: task_id.to_string(),
                column,
            });
        }
        permissions::check(self.actor(), Action::Delete, Some(task))?;
        if !self.context.confirm.confirm(DELETE_PROMPT) {
            debug!(task_id, "delete declined");
            return Ok(false);
        }

        self.api.delete_task(task_id).await?;
        self.board.remove(task_id);
        self.expanded.remove(task_id);
        if self.editing.as_ref().is_some_and(|e| e.task_id == task_id) {
            self.editing = None;
        }
        if self.comments.as_ref().is_some_and(|c| c.task_id == task_id) {
            self.comments = None;
        }
        info!(task_id, "task deleted");
        self.context.notify_task_update();
        Ok(true)
    }

    pub async fn edit_task_title(&mut self, task_id: &str, new_title: &str) -> Result<()> {
        if new_title.trim().is_empty() {
            return Err(BoardError::EmptyTitle);
        }
        let task = self.existing(task_id)?;
        permissions::check(self.actor(), Action::EditTitle, Some(task))?;

        let patch = TaskPatch {
            title: Some(new_title.to_string()),
            ..Default::default()
        };
        self.api.update_task(task_id, &patch).await?;
        if let Some(task) = self.board.task_mut(task_id) {
            task.title = new_title.to_string();
        }
        if self.editing.as_ref().is_some_and(|e| e.task_id == task_id) {
            self.editing = None;
        }
        info!(task_id, "task title updated");
        self.context.notify_task_update();
        Ok(())
    }

    /// Opens the edit session for `task_id`, dropping any other unsaved one.
    pub fn start_edit(&mut self, task_id: &str) -> Result<&EditSession> {
        let task = self.existing(task_id)?;
        permissions::check(self.actor(), Action::EditTitle, Some(task))?;
        let session = EditSession {
            task_id: task_id.to_string(),
            draft: task.title.clone(),
        };
        if let Some(previous) = self.editing.replace(session) {
            if previous.task_id != task_id {
                debug!(task_id = %previous.task_id, "unsaved edit discarded");
            }
        }
        self.editing.as_ref().ok_or(BoardError::NoEditInProgress)
    }

    pub fn editing(&self) -> Option<&EditSession> {
        self.editing.as_ref()
    }

    pub fn set_edit_draft(&mut self, draft: impl Into<String>) -> Result<()> {
        let session = self.editing.as_mut().ok_or(BoardError::NoEditInProgress)?;
        session.draft = draft.into();
        Ok(())
    }

    /// Saves the open edit session. The session stays open on failure.
    pub async fn save_edit(&mut self) -> Result<()> {
        let session = self.editing.clone().ok_or(BoardError::NoEditInProgress)?;
        self.edit_task_title(&session.task_id, &session.draft).await
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// `None` clears the due date.
    pub async fn set_due_date(&mut self, task_id: &str, date: Option<Date>) -> Result<()> {
        let task = self.existing(task_id)?;
        permissions::check(self.actor(), Action::SetDueDate, Some(task))?;

        let patch = TaskPatch {
            due_date: Some(date),
            ..Default::default()
        };
        self.api.update_task(task_id, &patch).await?;
        if let Some(task) = self.board.task_mut(task_id) {
            task.due_date = date;
        }
        info!(task_id, "task due date updated");
        self.context.notify_task_update();
        Ok(())
    }

    /// Assigns `user_id`, or unassigns with `None`. The local assignee is
    /// whatever the server resolved the id to.
    pub async fn assign_task(&mut self, task_id: &str, user_id: Option<&str>) -> Result<()> {
        let user_id = user_id.filter(|id| !id.is_empty());
        let task = self.existing(task_id)?;
        permissions::check(
            self.actor(),
            Action::Assign {
                assigning: user_id.is_some(),
            },
            Some(task),
        )?;

        let assignment = Assignment {
            assignee_id: user_id.unwrap_or_default().to_string(),
        };
        let assignee = self.api.assign_task(task_id, &assignment).await?;
        if let Some(task) = self.board.task_mut(task_id) {
            task.assignee = assignee;
        }
        info!(task_id, assignee = ?user_id, "task assignment updated");
        Ok(())
    }

    /// Opens the comment view for a task, always fetching the list afresh.
    /// The task's unread marker is cleared as soon as the view opens.
    pub async fn open_comments(&mut self, task_id: &str) -> Result<&[Comment]> {
        self.existing(task_id)?;
        if let Some(task) = self.board.task_mut(task_id) {
            task.has_unread_comments = false;
        }
        self.comments = Some(CommentThread {
            task_id: task_id.to_string(),
            comments: Vec::new(),
        });

        let comments = self.api.list_comments(task_id).await?;
        let thread = self.comments.get_or_insert_with(|| CommentThread {
            task_id: task_id.to_string(),
            comments: Vec::new(),
        });
        thread.task_id = task_id.to_string();
        thread.comments = comments;
        Ok(&thread.comments)
    }

    pub fn comments(&self) -> Option<&CommentThread> {
        self.comments.as_ref()
    }

    pub fn close_comments(&mut self) {
        self.comments = None;
    }

    pub async fn add_comment(&mut self, task_id: &str, text: &str) -> Result<Comment> {
        if text.trim().is_empty() {
            return Err(BoardError::EmptyComment);
        }
        self.existing(task_id)?;

        let request = NewComment {
            content: text.to_string(),
        };
        let comment = self.api.add_comment(task_id, &request).await?;
        if let Some(thread) = self.comments.as_mut().filter(|c| c.task_id == task_id) {
            thread.comments.insert(0, comment.clone());
        }
        if let Some(task) = self.board.task_mut(task_id) {
            task.comments_count = task.comments_count.saturating_add(1);
        }
        info!(task_id, comment_id = %comment.id, "comment added");
        Ok(comment)
    }
}
