//! Persistence port for task aggregates.

use crate::ledger::domain::UserId;
use crate::task::domain::{Task, TaskId, TaskStatus};
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// Result alias for repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Errors surfaced by task persistence.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same identifier already exists.
    #[error("task {0} already exists")]
    DuplicateTask(TaskId),

    /// No task with the given identifier exists.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The aggregate changed since it was read.
    #[error("task {task_id}: version conflict (expected {expected}, found {actual})")]
    Conflict {
        /// The contested task.
        task_id: TaskId,
        /// Version the caller read.
        expected: u64,
        /// Version found in the store.
        actual: u64,
    },

    /// The backing store failed.
    #[error("persistence error: {0}")]
    Persistence(#[source] Arc<dyn Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a backend error as a persistence failure.
    pub fn persistence(err: impl Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Storage contract for task aggregates.
///
/// `save` and `remove` use optimistic concurrency: the caller passes the
/// version it read and the store rejects the write with
/// [`TaskRepositoryError::Conflict`] when the stored version differs.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a freshly created task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when the identifier
    /// is already present.
    async fn store(&self, task: Task) -> TaskRepositoryResult<()>;

    /// Persists a modified aggregate, bumping its version.
    ///
    /// Returns the aggregate as stored, with the bumped version, so the
    /// caller continues from current state.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] for an unknown task or
    /// [`TaskRepositoryError::Conflict`] when the stored version differs
    /// from `expected_version`.
    async fn save(&self, task: Task, expected_version: u64) -> TaskRepositoryResult<Task>;

    /// Removes a task outright.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] for an unknown task or
    /// [`TaskRepositoryError::Conflict`] on a stale version.
    async fn remove(&self, id: TaskId, expected_version: u64) -> TaskRepositoryResult<()>;

    /// Fetches a task by identifier.
    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Lists tasks in the given status, newest first.
    async fn list_by_status(&self, status: TaskStatus) -> TaskRepositoryResult<Vec<Task>>;

    /// Lists tasks posted by `creator`, newest first.
    async fn list_created_by(&self, creator: UserId) -> TaskRepositoryResult<Vec<Task>>;

    /// Lists tasks assigned to `performer`, newest first.
    async fn list_assigned_to(&self, performer: UserId) -> TaskRepositoryResult<Vec<Task>>;
}
