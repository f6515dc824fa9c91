//! Error types for task domain validation and state rules.

use super::{TaskId, TaskStatus};
use crate::ledger::domain::UserId;
use thiserror::Error;

/// Errors returned while constructing domain task values or applying
/// lifecycle rules.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The task title exceeds the permitted length.
    #[error("task title has {actual} characters, exceeds limit of {max}")]
    TitleTooLong {
        /// Maximum permitted length.
        max: usize,
        /// Actual length supplied.
        actual: usize,
    },

    /// The task description is empty after trimming.
    #[error("task description must not be empty")]
    EmptyDescription,

    /// The task description exceeds the permitted length.
    #[error("task description has {actual} characters, exceeds limit of {max}")]
    DescriptionTooLong {
        /// Maximum permitted length.
        max: usize,
        /// Actual length supplied.
        actual: usize,
    },

    /// The task price must be at least one credit.
    #[error("task price must be at least 1 credit")]
    ZeroCredits,

    /// The operation requires an open task.
    #[error("task {task_id} is not open (status: {})", status.as_str())]
    NotOpen {
        /// The task that rejected the operation.
        task_id: TaskId,
        /// Status at the time of the attempt.
        status: TaskStatus,
    },

    /// The operation requires an assigned task.
    #[error("task {task_id} is not assigned (status: {})", status.as_str())]
    NotAssigned {
        /// The task that rejected the operation.
        task_id: TaskId,
        /// Status at the time of the attempt.
        status: TaskStatus,
    },

    /// The operation requires a disputed task.
    #[error("task {task_id} is not disputed (status: {})", status.as_str())]
    NotDisputed {
        /// The task that rejected the operation.
        task_id: TaskId,
        /// Status at the time of the attempt.
        status: TaskStatus,
    },

    /// A creator may not request their own task.
    #[error("user {user} cannot request their own task {task_id}")]
    SelfRequest {
        /// The task being requested.
        task_id: TaskId,
        /// The creator attempting the request.
        user: UserId,
    },

    /// The user already requested this task.
    #[error("user {user} already requested task {task_id}")]
    AlreadyRequested {
        /// The task being requested.
        task_id: TaskId,
        /// The repeat requester.
        user: UserId,
    },

    /// The user never requested this task.
    #[error("user {user} has not requested task {task_id}")]
    NotRequested {
        /// The task being assigned.
        task_id: TaskId,
        /// The user who never requested it.
        user: UserId,
    },

    /// The user already recorded their completion confirmation.
    #[error("user {user} already confirmed completion of task {task_id}")]
    AlreadyConfirmed {
        /// The task being confirmed.
        task_id: TaskId,
        /// The repeat confirmer.
        user: UserId,
    },

    /// Completion cannot finalise before both parties confirm.
    #[error("task {task_id} is missing a completion confirmation")]
    ConfirmationIncomplete {
        /// The task awaiting confirmation.
        task_id: TaskId,
    },

    /// The caller lacks the required relationship to the task.
    #[error("user {user} is not authorized to modify task {task_id}")]
    NotAuthorized {
        /// The task being modified.
        task_id: TaskId,
        /// The unauthorised caller.
        user: UserId,
    },
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing dispute resolutions from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown dispute resolution: {0}")]
pub struct ParseDisputeResolutionError(pub String);
