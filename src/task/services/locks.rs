//! Per-task async lock registry.

use crate::task::domain::TaskId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

/// Hands out one async mutex per task identifier.
///
/// Every state transition on a task runs under its lock, so concurrent
/// callers on the same task serialise while different tasks proceed in
/// parallel. The inner registry lock is held only long enough to clone the
/// per-task mutex, never across an await.
#[derive(Debug, Default)]
pub(crate) struct TaskLocks {
    registry: Mutex<HashMap<TaskId, Arc<tokio::sync::Mutex<()>>>>,
}

impl TaskLocks {
    /// Acquires the lock for `task`, creating it on first use.
    pub(crate) async fn acquire(&self, task: TaskId) -> OwnedMutexGuard<()> {
        let lock = {
            // The guarded data is (), so a poisoned registry is still sound.
            let mut registry = self
                .registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(registry.entry(task).or_default())
        };
        lock.lock_owned().await
    }

    /// Drops the registry entry for a task that no longer exists.
    pub(crate) fn discard(&self, task: TaskId) {
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        registry.remove(&task);
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, task: TaskId) -> bool {
        let registry = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        registry.contains_key(&task)
    }
}
