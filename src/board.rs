use std::collections::HashMap;

use crate::model::{Status, Task, COLUMN_ORDER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub id: Status,
    pub title: String,
    pub task_ids: Vec<String>,
}

impl Column {
    fn empty(id: Status) -> Self {
        Column {
            id,
            title: id.title().to_string(),
            task_ids: Vec::new(),
        }
    }

    pub fn position(&self, task_id: &str) -> Option<usize> {
        self.task_ids.iter().position(|id| id == task_id)
    }
}

/// The four fixed columns plus the task mapping.
///
/// Every id listed in a column is a key of `tasks` and every key of `tasks`
/// is listed in exactly one column. All mutators preserve that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    columns: [Column; 4],
    tasks: HashMap<String, Task>,
}

impl Default for Board {
    fn default() -> Self {
        Board {
            columns: COLUMN_ORDER.map(Column::empty),
            tasks: HashMap::new(),
        }
    }
}

fn slot(status: Status) -> usize {
    match status {
        Status::Todo => 0,
        Status::InProgress => 1,
        Status::Done => 2,
        Status::Blocked => 3,
    }
}

impl Board {
    /// Builds a board from a full listing, keeping the listing's order inside
    /// each column. A repeated id keeps its last occurrence.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut board = Board::default();
        for task in tasks {
            if board.tasks.contains_key(&task.id) {
                board.remove(&task.id);
            }
            board.column_mut(task.status).task_ids.push(task.id.clone());
            board.tasks.insert(task.id.clone(), task);
        }
        board
    }

    pub fn columns(&self) -> &[Column; 4] {
        &self.columns
    }

    pub fn column(&self, status: Status) -> &Column {
        &self.columns[slot(status)]
    }

    fn column_mut(&mut self, status: Status) -> &mut Column {
        &mut self.columns[slot(status)]
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    pub fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(task_id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks of a column in display order.
    pub fn column_tasks(&self, status: Status) -> impl Iterator<Item = &Task> {
        self.column(status)
            .task_ids
            .iter()
            .filter_map(|id| self.tasks.get(id))
    }

    pub fn locate(&self, task_id: &str) -> Option<(Status, usize)> {
        self.columns
            .iter()
            .find_map(|c| c.position(task_id).map(|index| (c.id, index)))
    }

    /// Moves the id at `from[from_index]` to `to[to_index]`. The index is
    /// clamped to the destination length after removal. The task's status
    /// follows the column it lands in.
    pub fn move_task(&mut self, from: Status, from_index: usize, to: Status, to_index: usize) -> bool {
        let source = self.column_mut(from);
        if from_index >= source.task_ids.len() {
            return false;
        }
        let task_id = source.task_ids.remove(from_index);
        let target = self.column_mut(to);
        let index = to_index.min(target.task_ids.len());
        target.task_ids.insert(index, task_id.clone());
        if let Some(task) = self.tasks.get_mut(&task_id) {
            task.status = to;
        }
        true
    }

    /// Newest-first insertion used for freshly created tasks.
    pub fn insert_front(&mut self, mut task: Task, column: Status) {
        if self.tasks.contains_key(&task.id) {
            self.remove(&task.id);
        }
        task.status = column;
        self.column_mut(column).task_ids.insert(0, task.id.clone());
        self.tasks.insert(task.id.clone(), task);
    }

    pub fn remove(&mut self, task_id: &str) -> Option<Task> {
        let task = self.tasks.remove(task_id)?;
        for column in &mut self.columns {
            column.task_ids.retain(|id| id != task_id);
        }
        Some(task)
    }
}
