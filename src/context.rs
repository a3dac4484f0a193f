//! Caller context injected into the board at construction.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

use crate::model::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub role: Role,
}

/// Asks the user to confirm a destructive action.
pub trait Confirm: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Line-based `[y/N]` prompt over any reader/writer pair.
pub struct PromptConfirm<R, W> {
    io: Mutex<(R, W)>,
}

impl<R, W> PromptConfirm<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        PromptConfirm {
            io: Mutex::new((reader, writer)),
        }
    }
}

impl PromptConfirm<io::BufReader<io::Stdin>, io::Stdout> {
    pub fn stdio() -> Self {
        PromptConfirm::new(io::BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> PromptConfirm<R, W>
where
    R: BufRead,
    W: Write,
{
    fn ask(&self, message: &str) -> io::Result<bool> {
        let mut guard = self
            .io
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "prompt poisoned"))?;
        let (reader, writer) = &mut *guard;
        write!(writer, "{} [y/N] ", message)?;
        writer.flush()?;
        let mut input = String::new();
        reader.read_line(&mut input)?;
        let answer = input.trim().to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}

impl<R, W> Confirm for PromptConfirm<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn confirm(&self, message: &str) -> bool {
        self.ask(message).unwrap_or(false)
    }
}

pub type TaskUpdateHook = Arc<dyn Fn() + Send + Sync>;

/// Everything the board needs to know about its host.
#[derive(Clone)]
pub struct BoardContext {
    pub user: CurrentUser,
    /// Forces an editable board for non-privileged roles.
    pub editable: bool,
    pub on_task_update: Option<TaskUpdateHook>,
    pub confirm: Arc<dyn Confirm>,
}

impl BoardContext {
    /// Deletes are declined until a confirmation prompt is installed.
    pub fn new(user: CurrentUser) -> Self {
        BoardContext {
            user,
            editable: false,
            on_task_update: None,
            confirm: Arc::new(|_: &str| false),
        }
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn on_task_update(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_task_update = Some(Arc::new(hook));
        self
    }

    pub fn confirm_with(mut self, confirm: impl Confirm + 'static) -> Self {
        self.confirm = Arc::new(confirm);
        self
    }

    /// Admins and project managers always get an editable board.
    pub fn is_editable(&self) -> bool {
        self.editable || matches!(self.user.role, Role::Admin | Role::Pm)
    }

    pub(crate) fn notify_task_update(&self) {
        if let Some(hook) = &self.on_task_update {
            hook();
        }
    }
}

impl fmt::Debug for BoardContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardContext")
            .field("user", &self.user)
            .field("editable", &self.editable)
            .field("on_task_update", &self.on_task_update.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn member() -> CurrentUser {
        CurrentUser {
            id: "u1".into(),
            name: "Sam".into(),
            role: Role::Member,
        }
    }

    #[test]
    fn prompt_accepts_yes() {
        let prompt = PromptConfirm::new(Cursor::new(b"Yes\n".to_vec()), Vec::new());
        assert!(prompt.confirm("Delete this task?"));
        let guard = prompt.io.lock().unwrap();
        assert_eq!(
            String::from_utf8_lossy(&guard.1),
            "Delete this task? [y/N] "
        );
    }

    #[test]
    fn prompt_defaults_to_no() {
        let prompt = PromptConfirm::new(Cursor::new(b"\n".to_vec()), Vec::new());
        assert!(!prompt.confirm("Delete this task?"));
        let eof = PromptConfirm::new(Cursor::new(Vec::new()), Vec::new());
        assert!(!eof.confirm("Delete this task?"));
    }

    #[test]
    fn editability_follows_role_or_flag() {
        let ctx = BoardContext::new(member());
        assert!(!ctx.is_editable());
        assert!(ctx.clone().editable(true).is_editable());

        let mut pm = member();
        pm.role = Role::Pm;
        assert!(BoardContext::new(pm).is_editable());
    }

    #[test]
    fn default_context_declines_confirmation() {
        let ctx = BoardContext::new(member());
        assert!(!ctx.confirm.confirm("Delete this task?"));
        let ctx = ctx.confirm_with(|_: &str| true);
        assert!(ctx.confirm.confirm("Delete this task?"));
    }
}
