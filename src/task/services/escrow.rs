//! Escrow orchestration for the task lifecycle.
//!
//! Every transition runs under the task's lock and persists through an
//! optimistic version check, so at most one of any set of racing callers
//! commits. Fund movements follow a fixed order: balances move first, the
//! aggregate saves second (with a compensating movement when the save
//! fails), and pending transaction records finalise last.

use crate::ledger::domain::{
    Credits, NewTransaction, Transaction, TransactionId, TransactionKind, TransactionStatus,
    UserId,
};
use crate::ledger::ports::{LedgerStore, LedgerStoreError};
use crate::task::domain::{
    ConfirmationProgress, DisputeResolution, NewTask, ResolutionShares, Task, TaskDescription,
    TaskDomainError, TaskEvent, TaskId, TaskStatus, TaskTitle, TaskView, UserProfile,
};
use crate::task::ports::{
    DirectoryError, TaskRepository, TaskRepositoryError, UserDirectory,
};
use crate::task::services::locks::TaskLocks;
use mockable::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Request payload for posting a new task.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTaskRequest {
    /// The posting user.
    pub creator: UserId,
    /// Raw title text; validated before the task is built.
    pub title: String,
    /// Raw description text; validated before the task is built.
    pub description: String,
    /// Price in credits.
    pub price: Credits,
    /// Skills asked of performers.
    pub skills: Vec<String>,
}

/// A committed transition: the task's new view plus the events it raised.
///
/// Events are returned to the caller rather than dispatched here, so
/// notification fan-out stays outside the locked section and a failed
/// delivery can never unwind a commit.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedTransition {
    /// The task as it reads after the commit.
    pub view: TaskView,
    /// Events raised by the transition, in order.
    pub events: Vec<TaskEvent>,
}

/// Service-level errors for escrow operations.
#[derive(Debug, Error)]
pub enum EscrowError {
    /// No task with the given identifier exists.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// The user has no registered profile.
    #[error("user {0} is not registered")]
    UnknownUser(UserId),

    /// The task holds escrow but no payment record references it.
    #[error("task {0} has no pending payment record")]
    MissingPaymentRecord(TaskId),

    /// Task lifecycle rules rejected the operation.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),

    /// Task persistence failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),

    /// A ledger operation failed.
    #[error(transparent)]
    Ledger(#[from] LedgerStoreError),

    /// Profile lookup failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Result type for escrow service operations.
pub type EscrowResult<T> = Result<T, EscrowError>;

const fn is_conflict(err: &EscrowError) -> bool {
    matches!(
        err,
        EscrowError::Repository(TaskRepositoryError::Conflict { .. })
    )
}

/// Task lifecycle orchestration over the repository, ledger, and
/// directory ports.
#[derive(Clone)]
pub struct EscrowService<R, L, D, C>
where
    R: TaskRepository,
    L: LedgerStore,
    D: UserDirectory,
    C: Clock + Send + Sync,
{
    tasks: Arc<R>,
    ledger: Arc<L>,
    directory: Arc<D>,
    clock: Arc<C>,
    locks: Arc<TaskLocks>,
}

impl<R, L, D, C> EscrowService<R, L, D, C>
where
    R: TaskRepository,
    L: LedgerStore,
    D: UserDirectory,
    C: Clock + Send + Sync,
{
    /// Creates a new escrow service.
    #[must_use]
    pub fn new(tasks: Arc<R>, ledger: Arc<L>, directory: Arc<D>, clock: Arc<C>) -> Self {
        Self {
            tasks,
            ledger,
            directory,
            clock,
            locks: Arc::new(TaskLocks::default()),
        }
    }

    /// Posts a new open task.
    ///
    /// The creator must be able to afford the price, but no funds move at
    /// creation: the balance check here is advisory, and the price is only
    /// re-checked and escrowed when a performer is assigned.
    ///
    /// # Errors
    ///
    /// Returns validation errors for the title, description, or price,
    /// [`EscrowError::UnknownUser`] when the creator is not registered, and
    /// [`LedgerStoreError::InsufficientFunds`] when the creator cannot
    /// cover the price.
    pub async fn create_task(&self, request: CreateTaskRequest) -> EscrowResult<CommittedTransition> {
        let title = TaskTitle::new(request.title)?;
        let description = TaskDescription::new(request.description)?;
        self.profile_of(request.creator).await?;
        let available = self.ledger.balance_of(request.creator).await?;
        if available < request.price {
            return Err(LedgerStoreError::InsufficientFunds {
                user: request.creator,
                available,
                required: request.price,
            }
            .into());
        }

        let skills: BTreeSet<String> = request
            .skills
            .into_iter()
            .map(|skill| skill.trim().to_owned())
            .filter(|skill| !skill.is_empty())
            .collect();
        let task = Task::create(
            NewTask {
                creator: request.creator,
                title,
                description,
                price: request.price,
                skills,
            },
            &*self.clock,
        )?;
        self.tasks.store(task.clone()).await?;
        info!(task = %task.id(), creator = %task.creator(), price = %task.price(), "task created");
        Ok(CommittedTransition {
            view: self.view_of(&task).await?,
            events: vec![TaskEvent::Created],
        })
    }

    /// Records a request from `user` to perform the task.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::TaskNotFound`] for an unknown task and
    /// domain errors for closed tasks, self-requests, and repeats.
    pub async fn request_task(
        &self,
        task_id: TaskId,
        user: UserId,
    ) -> EscrowResult<CommittedTransition> {
        self.profile_of(user).await?;
        let _guard = self.locks.acquire(task_id).await;
        let first = self.apply_request(task_id, user).await;
        self.retry_on_conflict(task_id, first, || self.apply_request(task_id, user))
            .await
    }

    /// Assigns the task to a requester and escrows the price.
    ///
    /// The creator's balance is debited and a pending `task_payment`
    /// record written before the assignment persists; a failed save hands
    /// the debit back and fails the record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError::InsufficientFunds`] when the creator
    /// cannot cover the price, and domain errors for unauthorised callers,
    /// closed tasks, or performers who never requested the task.
    pub async fn assign_task(
        &self,
        task_id: TaskId,
        caller: UserId,
        performer: UserId,
    ) -> EscrowResult<CommittedTransition> {
        let _guard = self.locks.acquire(task_id).await;
        let first = self.apply_assign(task_id, caller, performer).await;
        self.retry_on_conflict(task_id, first, || {
            self.apply_assign(task_id, caller, performer)
        })
        .await
    }

    /// Records a completion confirmation; releases the escrow once both
    /// parties have confirmed.
    ///
    /// # Errors
    ///
    /// Returns domain errors for non-assigned tasks, outsiders, and
    /// repeat confirmations, and [`EscrowError::MissingPaymentRecord`]
    /// when the escrow record cannot be found at release time.
    pub async fn confirm_completion(
        &self,
        task_id: TaskId,
        user: UserId,
    ) -> EscrowResult<CommittedTransition> {
        let result = {
            let _guard = self.locks.acquire(task_id).await;
            let first = self.apply_confirm(task_id, user).await;
            self.retry_on_conflict(task_id, first, || self.apply_confirm(task_id, user))
                .await
        };
        self.discard_lock_if_terminal(task_id, &result);
        result
    }

    /// Cancels an open task.
    ///
    /// Cancellation is only reachable while the task is open, so no funds
    /// are at stake.
    ///
    /// # Errors
    ///
    /// Returns domain errors for unauthorised callers and tasks that have
    /// left the open status.
    pub async fn cancel_task(
        &self,
        task_id: TaskId,
        caller: UserId,
    ) -> EscrowResult<CommittedTransition> {
        let result = {
            let _guard = self.locks.acquire(task_id).await;
            let first = self.apply_cancel(task_id, caller).await;
            self.retry_on_conflict(task_id, first, || self.apply_cancel(task_id, caller))
                .await
        };
        self.discard_lock_if_terminal(task_id, &result);
        result
    }

    /// Deletes an open task outright.
    ///
    /// # Errors
    ///
    /// Returns domain errors for unauthorised callers and tasks that have
    /// left the open status.
    pub async fn delete_task(
        &self,
        task_id: TaskId,
        caller: UserId,
    ) -> EscrowResult<CommittedTransition> {
        let result = {
            let _guard = self.locks.acquire(task_id).await;
            let first = self.apply_delete(task_id, caller).await;
            self.retry_on_conflict(task_id, first, || self.apply_delete(task_id, caller))
                .await
        };
        if result.is_ok() {
            self.locks.discard(task_id);
        }
        result
    }

    /// Freezes the escrow by raising a dispute.
    ///
    /// # Errors
    ///
    /// Returns domain errors for non-assigned tasks and callers who are
    /// neither creator nor performer.
    pub async fn raise_dispute(
        &self,
        task_id: TaskId,
        caller: UserId,
        reason: impl Into<String>,
    ) -> EscrowResult<CommittedTransition> {
        let reason = reason.into();
        let _guard = self.locks.acquire(task_id).await;
        let first = self.apply_raise_dispute(task_id, caller, reason.clone()).await;
        self.retry_on_conflict(task_id, first, || {
            self.apply_raise_dispute(task_id, caller, reason.clone())
        })
        .await
    }

    /// Settles a dispute, dividing the escrow per the resolution.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotDisputed`] unless a dispute is open
    /// and [`EscrowError::MissingPaymentRecord`] when the escrow record
    /// cannot be found.
    pub async fn resolve_dispute(
        &self,
        task_id: TaskId,
        resolution: DisputeResolution,
    ) -> EscrowResult<CommittedTransition> {
        let result = {
            let _guard = self.locks.acquire(task_id).await;
            let first = self.apply_resolve(task_id, resolution).await;
            self.retry_on_conflict(task_id, first, || self.apply_resolve(task_id, resolution))
                .await
        };
        self.discard_lock_if_terminal(task_id, &result);
        result
    }

    /// Drops the task's lock registry entry once no further transition can
    /// reach it. Stragglers already queued on the old mutex fail their
    /// status checks after acquiring it.
    fn discard_lock_if_terminal(&self, task_id: TaskId, result: &EscrowResult<CommittedTransition>) {
        if result
            .as_ref()
            .is_ok_and(|committed| committed.view.status.is_terminal())
        {
            self.locks.discard(task_id);
        }
    }

    #[cfg(test)]
    pub(crate) fn holds_lock_for(&self, task_id: TaskId) -> bool {
        self.locks.contains(task_id)
    }

    /// Fetches one task as a joined view.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::TaskNotFound`] for an unknown task.
    pub async fn get_task(&self, task_id: TaskId) -> EscrowResult<TaskView> {
        let task = self.load(task_id).await?;
        self.view_of(&task).await
    }

    /// Lists open tasks, newest first.
    ///
    /// # Errors
    ///
    /// Returns repository or directory errors when the listing cannot be
    /// built.
    pub async fn list_open(&self) -> EscrowResult<Vec<TaskView>> {
        self.views_of(&self.tasks.list_by_status(TaskStatus::Open).await?)
            .await
    }

    /// Lists tasks posted by `creator`, newest first.
    ///
    /// # Errors
    ///
    /// Returns repository or directory errors when the listing cannot be
    /// built.
    pub async fn list_created_by(&self, creator: UserId) -> EscrowResult<Vec<TaskView>> {
        self.views_of(&self.tasks.list_created_by(creator).await?)
            .await
    }

    /// Lists tasks assigned to `performer`, newest first.
    ///
    /// # Errors
    ///
    /// Returns repository or directory errors when the listing cannot be
    /// built.
    pub async fn list_assigned_to(&self, performer: UserId) -> EscrowResult<Vec<TaskView>> {
        self.views_of(&self.tasks.list_assigned_to(performer).await?)
            .await
    }

    async fn apply_request(&self, task_id: TaskId, user: UserId) -> EscrowResult<CommittedTransition> {
        let mut task = self.load(task_id).await?;
        let version = task.version();
        task.add_request(user, self.clock.utc())?;
        let saved = self.tasks.save(task, version).await?;
        info!(task = %task_id, user = %user, "task requested");
        Ok(CommittedTransition {
            view: self.view_of(&saved).await?,
            events: vec![TaskEvent::Requested { requested_by: user }],
        })
    }

    async fn apply_assign(
        &self,
        task_id: TaskId,
        caller: UserId,
        performer: UserId,
    ) -> EscrowResult<CommittedTransition> {
        let mut task = self.load(task_id).await?;
        let version = task.version();
        task.assign(caller, performer, self.clock.utc())?;
        let price = task.price();

        // Escrow the price before the assignment becomes visible.
        self.ledger.debit(caller, price).await?;
        let payment = Transaction::new(
            NewTransaction {
                from_user: Some(caller),
                to_user: Some(performer),
                task: Some(task_id),
                amount: price,
                kind: TransactionKind::TaskPayment,
                status: TransactionStatus::Pending,
                notes: None,
            },
            &*self.clock,
        )
        .map_err(LedgerStoreError::persistence)?;
        if let Err(err) = self.ledger.record_transaction(payment.clone()).await {
            self.ledger.credit(caller, price).await?;
            return Err(err.into());
        }
        task.attach_escrow_payment(payment.id());

        let saved = match self.tasks.save(task, version).await {
            Ok(saved) => saved,
            Err(err) => {
                // The assignment did not land: hand the escrow back and
                // fail the payment record.
                self.ledger.credit(caller, price).await?;
                self.ledger
                    .update_transaction_status(payment.id(), TransactionStatus::Failed)
                    .await?;
                return Err(err.into());
            }
        };
        info!(
            task = %task_id,
            performer = %performer,
            escrow = %price,
            payment = %payment.id(),
            "task assigned, price escrowed"
        );
        Ok(CommittedTransition {
            view: self.view_of(&saved).await?,
            events: vec![TaskEvent::Assigned { performer }],
        })
    }

    async fn apply_confirm(&self, task_id: TaskId, user: UserId) -> EscrowResult<CommittedTransition> {
        let mut task = self.load(task_id).await?;
        let version = task.version();
        let now = self.clock.utc();
        let progress = task.confirm_completion(user, now)?;

        match progress {
            ConfirmationProgress::Awaiting {
                confirmed_by,
                awaiting,
            } => {
                let saved = self.tasks.save(task, version).await?;
                info!(task = %task_id, confirmed_by = %confirmed_by, awaiting = %awaiting, "completion confirmed");
                Ok(CommittedTransition {
                    view: self.view_of(&saved).await?,
                    events: vec![TaskEvent::CompletionConfirmed {
                        confirmed_by,
                        awaiting,
                    }],
                })
            }
            ConfirmationProgress::Ready { performer } => {
                let amount = task.finalize_completion(now)?;
                let payment = task
                    .escrow_payment()
                    .ok_or(EscrowError::MissingPaymentRecord(task_id))?;

                self.ledger.credit(performer, amount).await?;
                let saved = match self.tasks.save(task, version).await {
                    Ok(saved) => saved,
                    Err(err) => {
                        // The completion did not land; pull the release
                        // back into escrow.
                        self.ledger.debit(performer, amount).await?;
                        return Err(err.into());
                    }
                };
                self.ledger
                    .update_transaction_status(payment, TransactionStatus::Completed)
                    .await?;
                info!(
                    task = %task_id,
                    performer = %performer,
                    amount = %amount,
                    "task completed, escrow released"
                );
                Ok(CommittedTransition {
                    view: self.view_of(&saved).await?,
                    events: vec![TaskEvent::Completed { performer, amount }],
                })
            }
        }
    }

    async fn apply_cancel(&self, task_id: TaskId, caller: UserId) -> EscrowResult<CommittedTransition> {
        let mut task = self.load(task_id).await?;
        let version = task.version();
        task.cancel(caller, self.clock.utc())?;
        let saved = self.tasks.save(task, version).await?;
        info!(task = %task_id, "task cancelled");
        Ok(CommittedTransition {
            view: self.view_of(&saved).await?,
            events: vec![TaskEvent::Cancelled],
        })
    }

    async fn apply_delete(&self, task_id: TaskId, caller: UserId) -> EscrowResult<CommittedTransition> {
        let task = self.load(task_id).await?;
        task.ensure_deletable(caller)?;
        let view = self.view_of(&task).await?;
        self.tasks.remove(task_id, task.version()).await?;
        info!(task = %task_id, "task deleted");
        Ok(CommittedTransition {
            view,
            events: vec![TaskEvent::Deleted { task_id }],
        })
    }

    async fn apply_raise_dispute(
        &self,
        task_id: TaskId,
        caller: UserId,
        reason: String,
    ) -> EscrowResult<CommittedTransition> {
        let mut task = self.load(task_id).await?;
        let version = task.version();
        let counterparty = task.raise_dispute(caller, reason, self.clock.utc())?;
        let saved = self.tasks.save(task, version).await?;
        info!(task = %task_id, raised_by = %caller, "dispute raised, escrow frozen");
        Ok(CommittedTransition {
            view: self.view_of(&saved).await?,
            events: vec![TaskEvent::DisputeRaised {
                raised_by: caller,
                counterparty,
            }],
        })
    }

    async fn apply_resolve(
        &self,
        task_id: TaskId,
        resolution: DisputeResolution,
    ) -> EscrowResult<CommittedTransition> {
        let mut task = self.load(task_id).await?;
        let version = task.version();
        let creator = task.creator();
        let performer = task.assignee().ok_or(TaskDomainError::NotAssigned {
            task_id,
            status: task.status(),
        })?;
        let payment = task
            .escrow_payment()
            .ok_or(EscrowError::MissingPaymentRecord(task_id))?;
        let shares = task.resolve_dispute(resolution, self.clock.utc())?;

        // Release both shares, then persist, then finalise the records.
        self.ledger.credit(performer, shares.performer).await?;
        if let Err(err) = self.ledger.credit(creator, shares.creator).await {
            self.ledger.debit(performer, shares.performer).await?;
            return Err(err.into());
        }
        let saved = match self.tasks.save(task, version).await {
            Ok(saved) => saved,
            Err(err) => {
                self.ledger.debit(performer, shares.performer).await?;
                self.ledger.debit(creator, shares.creator).await?;
                return Err(err.into());
            }
        };
        self.finalize_dispute_records(task_id, resolution, payment, creator, performer, &shares)
            .await?;
        info!(
            task = %task_id,
            resolution = resolution.as_str(),
            to_performer = %shares.performer,
            to_creator = %shares.creator,
            "dispute resolved"
        );
        Ok(CommittedTransition {
            view: self.view_of(&saved).await?,
            events: vec![TaskEvent::DisputeResolved { resolution }],
        })
    }

    /// Settles the pending payment record and writes the movement records
    /// a resolution calls for. Zero shares produce no record.
    async fn finalize_dispute_records(
        &self,
        task_id: TaskId,
        resolution: DisputeResolution,
        payment: TransactionId,
        creator: UserId,
        performer: UserId,
        shares: &ResolutionShares,
    ) -> EscrowResult<()> {
        if resolution == DisputeResolution::PerformerFavor {
            self.ledger
                .update_transaction_status(payment, TransactionStatus::Completed)
                .await?;
            return Ok(());
        }
        self.ledger
            .update_transaction_status(payment, TransactionStatus::Cancelled)
            .await?;
        if !shares.performer.is_zero() {
            self.record_movement(NewTransaction {
                from_user: Some(creator),
                to_user: Some(performer),
                task: Some(task_id),
                amount: shares.performer,
                kind: TransactionKind::DisputeResolution,
                status: TransactionStatus::Completed,
                notes: None,
            })
            .await?;
        }
        if !shares.creator.is_zero() {
            let kind = if resolution == DisputeResolution::CreatorFavor {
                TransactionKind::Refund
            } else {
                TransactionKind::DisputeResolution
            };
            self.record_movement(NewTransaction {
                from_user: None,
                to_user: Some(creator),
                task: Some(task_id),
                amount: shares.creator,
                kind,
                status: TransactionStatus::Completed,
                notes: None,
            })
            .await?;
        }
        Ok(())
    }

    async fn record_movement(&self, fields: NewTransaction) -> EscrowResult<()> {
        let record =
            Transaction::new(fields, &*self.clock).map_err(LedgerStoreError::persistence)?;
        self.ledger.record_transaction(record).await?;
        Ok(())
    }

    async fn retry_on_conflict<T, F, Fut>(
        &self,
        task_id: TaskId,
        first: EscrowResult<T>,
        retry: F,
    ) -> EscrowResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = EscrowResult<T>>,
    {
        match first {
            Err(err) if is_conflict(&err) => {
                warn!(task = %task_id, "version conflict, retrying once");
                retry().await
            }
            other => other,
        }
    }

    async fn load(&self, task_id: TaskId) -> EscrowResult<Task> {
        self.tasks
            .find_by_id(task_id)
            .await?
            .ok_or(EscrowError::TaskNotFound(task_id))
    }

    async fn profile_of(&self, user: UserId) -> EscrowResult<UserProfile> {
        self.directory
            .find_profile(user)
            .await?
            .ok_or(EscrowError::UnknownUser(user))
    }

    async fn view_of(&self, task: &Task) -> EscrowResult<TaskView> {
        let creator = self.profile_of(task.creator()).await?;
        let mut requests = Vec::with_capacity(task.requests().len());
        for user in task.requests() {
            requests.push(self.profile_of(*user).await?);
        }
        let assignee = match task.assignee() {
            Some(user) => Some(self.profile_of(user).await?),
            None => None,
        };
        Ok(TaskView::join(task, creator, requests, assignee))
    }

    async fn views_of(&self, tasks: &[Task]) -> EscrowResult<Vec<TaskView>> {
        let mut views = Vec::with_capacity(tasks.len());
        for task in tasks {
            views.push(self.view_of(task).await?);
        }
        Ok(views)
    }
}
