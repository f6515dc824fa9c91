//! Thread-safe in-memory task repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::ledger::domain::UserId;
use crate::task::domain::{Task, TaskId, TaskStatus};
use crate::task::ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult};

/// In-memory [`TaskRepository`] backed by a single `RwLock`.
///
/// Version checks happen inside the write section, so two writers racing
/// on the same aggregate cannot both pass the compare-and-swap.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl InMemoryTaskRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> TaskRepositoryResult<std::sync::RwLockReadGuard<'_, HashMap<TaskId, Task>>> {
        self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(
        &self,
    ) -> TaskRepositoryResult<std::sync::RwLockWriteGuard<'_, HashMap<TaskId, Task>>> {
        self.state.write().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn collect_sorted(
        &self,
        predicate: impl Fn(&Task) -> bool,
    ) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.read()?;
        let mut tasks: Vec<Task> = state.values().filter(|task| predicate(task)).cloned().collect();
        tasks.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(tasks)
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn store(&self, task: Task) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        let id = task.id();
        if state.contains_key(&id) {
            return Err(TaskRepositoryError::DuplicateTask(id));
        }
        state.insert(id, task);
        debug!(task = %id, "task stored");
        Ok(())
    }

    async fn save(&self, mut task: Task, expected_version: u64) -> TaskRepositoryResult<Task> {
        let mut state = self.write()?;
        let id = task.id();
        let stored = state.get(&id).ok_or(TaskRepositoryError::NotFound(id))?;
        let actual = stored.version();
        if actual != expected_version {
            return Err(TaskRepositoryError::Conflict {
                task_id: id,
                expected: expected_version,
                actual,
            });
        }
        task.set_version(actual.wrapping_add(1));
        state.insert(id, task.clone());
        debug!(task = %id, version = task.version(), "task saved");
        Ok(task)
    }

    async fn remove(&self, id: TaskId, expected_version: u64) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        let stored = state.get(&id).ok_or(TaskRepositoryError::NotFound(id))?;
        let actual = stored.version();
        if actual != expected_version {
            return Err(TaskRepositoryError::Conflict {
                task_id: id,
                expected: expected_version,
                actual,
            });
        }
        state.remove(&id);
        debug!(task = %id, "task removed");
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let state = self.read()?;
        Ok(state.get(&id).cloned())
    }

    async fn list_by_status(&self, status: TaskStatus) -> TaskRepositoryResult<Vec<Task>> {
        self.collect_sorted(|task| task.status() == status)
    }

    async fn list_created_by(&self, creator: UserId) -> TaskRepositoryResult<Vec<Task>> {
        self.collect_sorted(|task| task.creator() == creator)
    }

    async fn list_assigned_to(&self, performer: UserId) -> TaskRepositoryResult<Vec<Task>> {
        self.collect_sorted(|task| task.assignee() == Some(performer))
    }
}
