//! The task aggregate and its lifecycle rules.

use super::{
    Dispute, DisputeResolution, ResolutionShares, TaskDescription, TaskDomainError, TaskId,
    TaskStatus, TaskTitle,
};
use crate::ledger::domain::{Credits, TransactionId, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which parties have confirmed completion of an assigned task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionConfirmation {
    /// The creator has confirmed the work is done.
    pub creator: bool,
    /// The performer has confirmed the work is done.
    pub performer: bool,
}

impl CompletionConfirmation {
    /// Returns `true` once both parties have confirmed.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        self.creator && self.performer
    }
}

/// Outcome of recording one completion confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationProgress {
    /// One confirmation is recorded; the counterparty has yet to confirm.
    Awaiting {
        /// The party whose confirmation was just recorded.
        confirmed_by: UserId,
        /// The party whose confirmation is still outstanding.
        awaiting: UserId,
    },
    /// Both confirmations are recorded; the escrow may be released.
    Ready {
        /// The assigned performer owed the escrowed payment.
        performer: UserId,
    },
}

/// Parameter object describing a task to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    /// The user posting the task.
    pub creator: UserId,
    /// Validated title.
    pub title: TaskTitle,
    /// Validated description.
    pub description: TaskDescription,
    /// Price in credits; must be positive.
    pub price: Credits,
    /// Skills the creator asks of performers.
    pub skills: BTreeSet<String>,
}

/// Raw task fields as read back from persistence.
///
/// Adapters rehydrate aggregates through [`Task::from_persisted`] rather
/// than the validating constructor, since stored data already passed
/// validation when it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTaskData {
    /// Record identifier.
    pub id: TaskId,
    /// The user who posted the task.
    pub creator: UserId,
    /// Stored title.
    pub title: TaskTitle,
    /// Stored description.
    pub description: TaskDescription,
    /// Price in credits.
    pub price: Credits,
    /// Requested skills.
    pub skills: BTreeSet<String>,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Users who requested the task, oldest first.
    pub requests: Vec<UserId>,
    /// The assigned performer, if any.
    pub assignee: Option<UserId>,
    /// The pending escrow payment record, if any.
    pub escrow_payment: Option<TransactionId>,
    /// Completion confirmations recorded so far.
    pub confirmation: CompletionConfirmation,
    /// The active or resolved dispute, if any.
    pub dispute: Option<Dispute>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency version.
    pub version: u64,
}

/// A posted task and the escrow state attached to it.
///
/// All lifecycle rules live on this type; services call mutators and
/// persist the result, so an aggregate read from the repository is always
/// internally consistent. Fields are private and reachable only through
/// accessors and mutators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    creator: UserId,
    title: TaskTitle,
    description: TaskDescription,
    price: Credits,
    skills: BTreeSet<String>,
    status: TaskStatus,
    requests: Vec<UserId>,
    assignee: Option<UserId>,
    escrow_payment: Option<TransactionId>,
    confirmation: CompletionConfirmation,
    dispute: Option<Dispute>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl Task {
    /// Creates a new open task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::ZeroCredits`] when the price is zero.
    pub fn create(fields: NewTask, clock: &impl Clock) -> Result<Self, TaskDomainError> {
        if fields.price.is_zero() {
            return Err(TaskDomainError::ZeroCredits);
        }
        let now = clock.utc();
        Ok(Self {
            id: TaskId::new(),
            creator: fields.creator,
            title: fields.title,
            description: fields.description,
            price: fields.price,
            skills: fields.skills,
            status: TaskStatus::Open,
            requests: Vec::new(),
            assignee: None,
            escrow_payment: None,
            confirmation: CompletionConfirmation::default(),
            dispute: None,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Rehydrates an aggregate from stored fields without re-validation.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            creator: data.creator,
            title: data.title,
            description: data.description,
            price: data.price,
            skills: data.skills,
            status: data.status,
            requests: data.requests,
            assignee: data.assignee,
            escrow_payment: data.escrow_payment,
            confirmation: data.confirmation,
            dispute: data.dispute,
            created_at: data.created_at,
            updated_at: data.updated_at,
            version: data.version,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the creator.
    #[must_use]
    pub const fn creator(&self) -> UserId {
        self.creator
    }

    /// Returns the title.
    #[must_use]
    pub const fn title(&self) -> &TaskTitle {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub const fn description(&self) -> &TaskDescription {
        &self.description
    }

    /// Returns the price in credits.
    #[must_use]
    pub const fn price(&self) -> Credits {
        self.price
    }

    /// Returns the requested skills.
    #[must_use]
    pub const fn skills(&self) -> &BTreeSet<String> {
        &self.skills
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the users who requested the task, oldest first.
    #[must_use]
    pub fn requests(&self) -> &[UserId] {
        &self.requests
    }

    /// Returns the assigned performer, if any.
    #[must_use]
    pub const fn assignee(&self) -> Option<UserId> {
        self.assignee
    }

    /// Returns the pending escrow payment record, if any.
    #[must_use]
    pub const fn escrow_payment(&self) -> Option<TransactionId> {
        self.escrow_payment
    }

    /// Returns the completion confirmations recorded so far.
    #[must_use]
    pub const fn confirmation(&self) -> CompletionConfirmation {
        self.confirmation
    }

    /// Returns the active or resolved dispute, if any.
    #[must_use]
    pub const fn dispute(&self) -> Option<&Dispute> {
        self.dispute.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the optimistic concurrency version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the credits currently held in escrow for this task.
    ///
    /// Escrow equals the price exactly while a performer is assigned (the
    /// dispute window included) and is zero in every other status.
    #[must_use]
    pub const fn escrowed_amount(&self) -> Credits {
        match self.status {
            TaskStatus::Assigned | TaskStatus::Disputed => self.price,
            TaskStatus::Open | TaskStatus::Completed | TaskStatus::Cancelled => Credits::ZERO,
        }
    }

    pub(crate) const fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Records a request from `user` to perform the task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotOpen`] unless the task is open,
    /// [`TaskDomainError::SelfRequest`] when the creator requests their own
    /// task, or [`TaskDomainError::AlreadyRequested`] on a repeat request.
    pub fn add_request(&mut self, user: UserId, now: DateTime<Utc>) -> Result<(), TaskDomainError> {
        self.ensure_status(TaskStatus::Open)?;
        if user == self.creator {
            return Err(TaskDomainError::SelfRequest {
                task_id: self.id,
                user,
            });
        }
        if self.requests.contains(&user) {
            return Err(TaskDomainError::AlreadyRequested {
                task_id: self.id,
                user,
            });
        }
        self.requests.push(user);
        self.updated_at = now;
        Ok(())
    }

    /// Assigns the task to `performer` on behalf of `caller`.
    ///
    /// The service escrows the price before persisting the assigned
    /// aggregate; this mutator only applies the state rules.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotAuthorized`] unless the caller is the
    /// creator, [`TaskDomainError::NotOpen`] unless the task is open, or
    /// [`TaskDomainError::NotRequested`] when the performer never requested
    /// the task.
    pub fn assign(
        &mut self,
        caller: UserId,
        performer: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        self.ensure_creator(caller)?;
        self.ensure_status(TaskStatus::Open)?;
        if !self.requests.contains(&performer) {
            return Err(TaskDomainError::NotRequested {
                task_id: self.id,
                user: performer,
            });
        }
        self.status = TaskStatus::Assigned;
        self.assignee = Some(performer);
        self.updated_at = now;
        Ok(())
    }

    /// Links the pending escrow payment record to the task.
    pub(crate) fn attach_escrow_payment(&mut self, payment: TransactionId) {
        self.escrow_payment = Some(payment);
    }

    /// Records a completion confirmation from `user`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotAssigned`] unless the task is
    /// assigned, [`TaskDomainError::NotAuthorized`] when the user is
    /// neither creator nor performer, or
    /// [`TaskDomainError::AlreadyConfirmed`] on a repeat confirmation.
    pub fn confirm_completion(
        &mut self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<ConfirmationProgress, TaskDomainError> {
        if self.status != TaskStatus::Assigned {
            return Err(TaskDomainError::NotAssigned {
                task_id: self.id,
                status: self.status,
            });
        }
        let performer = self.ensure_assignee()?;
        let already = if user == self.creator {
            std::mem::replace(&mut self.confirmation.creator, true)
        } else if user == performer {
            std::mem::replace(&mut self.confirmation.performer, true)
        } else {
            return Err(TaskDomainError::NotAuthorized {
                task_id: self.id,
                user,
            });
        };
        if already {
            return Err(TaskDomainError::AlreadyConfirmed {
                task_id: self.id,
                user,
            });
        }
        self.updated_at = now;
        if self.confirmation.is_complete() {
            Ok(ConfirmationProgress::Ready { performer })
        } else {
            let awaiting = if user == self.creator {
                performer
            } else {
                self.creator
            };
            Ok(ConfirmationProgress::Awaiting {
                confirmed_by: user,
                awaiting,
            })
        }
    }

    /// Completes the task once both confirmations are recorded.
    ///
    /// Returns the escrowed amount owed to the performer.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotAssigned`] unless the task is assigned
    /// or [`TaskDomainError::ConfirmationIncomplete`] when either
    /// confirmation is outstanding.
    pub fn finalize_completion(&mut self, now: DateTime<Utc>) -> Result<Credits, TaskDomainError> {
        if self.status != TaskStatus::Assigned {
            return Err(TaskDomainError::NotAssigned {
                task_id: self.id,
                status: self.status,
            });
        }
        if !self.confirmation.is_complete() {
            return Err(TaskDomainError::ConfirmationIncomplete { task_id: self.id });
        }
        self.status = TaskStatus::Completed;
        self.updated_at = now;
        Ok(self.price)
    }

    /// Cancels an open task on behalf of its creator.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotAuthorized`] unless the caller is the
    /// creator or [`TaskDomainError::NotOpen`] once a performer is
    /// assigned.
    pub fn cancel(&mut self, caller: UserId, now: DateTime<Utc>) -> Result<(), TaskDomainError> {
        self.ensure_creator(caller)?;
        self.ensure_status(TaskStatus::Open)?;
        self.status = TaskStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// Checks that `caller` may delete the task outright.
    ///
    /// Deletion removes the record entirely and is only permitted while
    /// the task is open, when no funds are at stake.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotAuthorized`] unless the caller is the
    /// creator or [`TaskDomainError::NotOpen`] for any other status.
    pub fn ensure_deletable(&self, caller: UserId) -> Result<(), TaskDomainError> {
        self.ensure_creator(caller)?;
        self.ensure_status(TaskStatus::Open)
    }

    /// Freezes the escrow by raising a dispute.
    ///
    /// Returns the counterparty to be notified.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotAssigned`] unless the task is assigned
    /// or [`TaskDomainError::NotAuthorized`] when the caller is neither
    /// creator nor performer.
    pub fn raise_dispute(
        &mut self,
        caller: UserId,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<UserId, TaskDomainError> {
        if self.status != TaskStatus::Assigned {
            return Err(TaskDomainError::NotAssigned {
                task_id: self.id,
                status: self.status,
            });
        }
        let performer = self.ensure_assignee()?;
        let counterparty = if caller == self.creator {
            performer
        } else if caller == performer {
            self.creator
        } else {
            return Err(TaskDomainError::NotAuthorized {
                task_id: self.id,
                user: caller,
            });
        };
        self.dispute = Some(Dispute::raise(reason, caller, now));
        self.status = TaskStatus::Disputed;
        self.updated_at = now;
        Ok(counterparty)
    }

    /// Resolves the dispute and completes the task.
    ///
    /// Returns how the escrowed price divides between performer and
    /// creator; the shares always sum to the full escrow.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotDisputed`] unless a dispute is open.
    pub fn resolve_dispute(
        &mut self,
        resolution: DisputeResolution,
        now: DateTime<Utc>,
    ) -> Result<ResolutionShares, TaskDomainError> {
        if self.status != TaskStatus::Disputed {
            return Err(TaskDomainError::NotDisputed {
                task_id: self.id,
                status: self.status,
            });
        }
        let Some(dispute) = self.dispute.as_mut() else {
            return Err(TaskDomainError::NotDisputed {
                task_id: self.id,
                status: self.status,
            });
        };
        dispute.resolve(resolution);
        self.status = TaskStatus::Completed;
        self.updated_at = now;
        let shares = match resolution {
            DisputeResolution::PerformerFavor => ResolutionShares {
                performer: self.price,
                creator: Credits::ZERO,
            },
            DisputeResolution::CreatorFavor => ResolutionShares {
                performer: Credits::ZERO,
                creator: self.price,
            },
            DisputeResolution::Split => {
                let (performer, creator) = self.price.split_half();
                ResolutionShares { performer, creator }
            }
        };
        Ok(shares)
    }

    fn ensure_creator(&self, caller: UserId) -> Result<(), TaskDomainError> {
        if caller == self.creator {
            Ok(())
        } else {
            Err(TaskDomainError::NotAuthorized {
                task_id: self.id,
                user: caller,
            })
        }
    }

    fn ensure_status(&self, expected: TaskStatus) -> Result<(), TaskDomainError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(TaskDomainError::NotOpen {
                task_id: self.id,
                status: self.status,
            })
        }
    }

    fn ensure_assignee(&self) -> Result<UserId, TaskDomainError> {
        self.assignee.ok_or(TaskDomainError::NotAssigned {
            task_id: self.id,
            status: self.status,
        })
    }
}
