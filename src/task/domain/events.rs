//! Domain events emitted by committed task transitions.

use super::{DisputeResolution, TaskId};
use crate::ledger::domain::{Credits, UserId};

/// A state change that observers of the exchange should hear about.
///
/// Events are collected while a transition commits and dispatched
/// afterwards, so a failed commit never leaks notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// A new task was posted.
    Created,
    /// A user asked to perform the task.
    Requested {
        /// The requesting user.
        requested_by: UserId,
    },
    /// The creator picked a performer and the price moved into escrow.
    Assigned {
        /// The chosen performer.
        performer: UserId,
    },
    /// One party confirmed completion; the other is still outstanding.
    CompletionConfirmed {
        /// The party whose confirmation was recorded.
        confirmed_by: UserId,
        /// The party whose confirmation is outstanding.
        awaiting: UserId,
    },
    /// Both parties confirmed and the escrow was released.
    Completed {
        /// The performer who received the escrow.
        performer: UserId,
        /// The amount released.
        amount: Credits,
    },
    /// The creator cancelled the open task.
    Cancelled,
    /// The creator deleted the open task outright.
    Deleted {
        /// The identifier of the removed record.
        task_id: TaskId,
    },
    /// A party froze the escrow by raising a dispute.
    DisputeRaised {
        /// The party who raised the dispute.
        raised_by: UserId,
        /// The party to be notified.
        counterparty: UserId,
    },
    /// The dispute was settled and the escrow divided.
    DisputeResolved {
        /// The outcome applied to the escrow.
        resolution: DisputeResolution,
    },
}
