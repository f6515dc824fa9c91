//! Read models joining tasks with user profiles.

use super::{CompletionConfirmation, Dispute, Task, TaskId, TaskStatus};
use crate::ledger::domain::{Credits, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Display profile for a user referenced by a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Account identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Avatar URL, if the user set one.
    pub avatar: Option<String>,
}

/// A task joined with the profiles of the users it references.
///
/// Views are what leaves the service layer: broadcast payloads and query
/// responses carry profiles rather than bare identifiers so consumers do
/// not need a second lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    /// Record identifier.
    pub id: TaskId,
    /// Title text.
    pub title: String,
    /// Description text.
    pub description: String,
    /// Price in credits.
    pub price: Credits,
    /// Requested skills.
    pub skills: BTreeSet<String>,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// The creator's profile.
    pub creator: UserProfile,
    /// Profiles of users who requested the task, oldest first.
    pub requests: Vec<UserProfile>,
    /// The assigned performer's profile, if any.
    pub assignee: Option<UserProfile>,
    /// Completion confirmations recorded so far.
    pub confirmation: CompletionConfirmation,
    /// The active or resolved dispute, if any.
    pub dispute: Option<Dispute>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    /// Joins a task with resolved profiles.
    ///
    /// `requests` and `assignee` must correspond to the task's own request
    /// list and assignee; the service layer resolves them before calling.
    #[must_use]
    pub fn join(
        task: &Task,
        creator: UserProfile,
        requests: Vec<UserProfile>,
        assignee: Option<UserProfile>,
    ) -> Self {
        Self {
            id: task.id(),
            title: task.title().as_str().to_owned(),
            description: task.description().as_str().to_owned(),
            price: task.price(),
            skills: task.skills().clone(),
            status: task.status(),
            creator,
            requests,
            assignee,
            confirmation: task.confirmation(),
            dispute: task.dispute().cloned(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}
