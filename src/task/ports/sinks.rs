//! Outbound ports for notifications and broadcast fan-out.

use crate::ledger::domain::UserId;
use crate::task::domain::{TaskId, TaskView};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// Category of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Relates to a task the user created, requested, or performs.
    Task,
    /// Relates to the user's credit balance.
    Credit,
}

/// A message addressed to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// The addressee.
    pub user: UserId,
    /// Category for client-side routing.
    pub kind: NotificationKind,
    /// Human-readable message text.
    pub message: String,
    /// The task the message concerns, if any.
    pub related_task: Option<TaskId>,
    /// When the notification was produced.
    pub created_at: DateTime<Utc>,
}

/// Result alias for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors surfaced by delivery sinks.
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    /// The sink's backing channel or store failed.
    #[error("delivery error: {0}")]
    Delivery(#[source] Arc<dyn Error + Send + Sync>),
}

impl SinkError {
    /// Wraps a backend error as a delivery failure.
    pub fn delivery(err: impl Error + Send + Sync + 'static) -> Self {
        Self::Delivery(Arc::new(err))
    }
}

/// Delivery target for per-user notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one notification to its addressee.
    async fn notify(&self, notification: Notification) -> SinkResult<()>;
}

/// Fan-out target for task state broadcasts.
///
/// `event` is the wire-level event name; the payload is the joined view of
/// the task after the transition committed.
#[async_trait]
pub trait BroadcastSink: Send + Sync {
    /// Publishes one task view under the given event name.
    async fn publish(&self, event: &str, view: &TaskView) -> SinkResult<()>;
}
