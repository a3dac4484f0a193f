//! Capability checks for board actions.
//!
//! All role and status guards go through [`check`], so the rules live in one
//! table instead of being repeated at each call site.

use crate::context::CurrentUser;
use crate::error::{BoardError, Result};
use crate::model::{Role, Status, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Drag a task from its current column into `to`.
    Move { to: Status },
    Create,
    EditTitle,
    Delete,
    SetDueDate,
    /// Change the assignee; `assigning` is false for an unassignment.
    Assign { assigning: bool },
}

/// Who is acting and on which board.
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub user: &'a CurrentUser,
    pub editable: bool,
}

impl Actor<'_> {
    fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }
}

/// Checks `action` against the task's pre-action state. `task` is `None`
/// only for [`Action::Create`].
pub fn check(actor: Actor<'_>, action: Action, task: Option<&Task>) -> Result<()> {
    match (action, task) {
        (Action::Create, _) => require_editable(actor, "create tasks"),
        (_, None) => Err(BoardError::Forbidden("unknown task".into())),
        (Action::Move { to }, Some(task)) => {
            if to == Status::InProgress && task.assignee.is_none() {
                return Err(BoardError::AssigneeRequired {
                    task_id: task.id.clone(),
                });
            }
            if task.status.is_terminal() && !actor.is_admin() {
                return Err(BoardError::AdminOnlyReopen(task.status));
            }
            if !actor.editable && !task.is_assigned_to(&actor.user.id) {
                return Err(BoardError::Forbidden(
                    "you can only move tasks assigned to you".into(),
                ));
            }
            Ok(())
        }
        (Action::EditTitle, Some(task)) | (Action::Delete, Some(task)) => {
            require_editable(actor, "change tasks on this board")?;
            if task.status == Status::Done && !actor.is_admin() {
                return Err(BoardError::Forbidden(
                    "only an administrator can change completed tasks".into(),
                ));
            }
            Ok(())
        }
        (Action::SetDueDate, Some(_)) => {
            require_editable(actor, "set due dates")?;
            match actor.user.role {
                Role::Admin | Role::Pm => Ok(()),
                Role::Member => Err(BoardError::Forbidden(
                    "only administrators and project managers can set due dates".into(),
                )),
            }
        }
        (Action::Assign { assigning }, Some(task)) => {
            require_editable(actor, "assign tasks")?;
            if matches!(task.status, Status::InProgress | Status::Done) && !actor.is_admin() {
                return Err(BoardError::Forbidden(format!(
                    "only an administrator can reassign tasks in {}",
                    task.status.title()
                )));
            }
            if assigning && task.due_date.is_none() {
                return Err(BoardError::DueDateRequired {
                    task_id: task.id.clone(),
                });
            }
            Ok(())
        }
    }
}

fn require_editable(actor: Actor<'_>, what: &str) -> Result<()> {
    if actor.editable {
        Ok(())
    } else {
        Err(BoardError::Forbidden(format!("you cannot {}", what)))
    }
}
