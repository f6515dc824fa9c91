//! Immutable ledger transaction records.

use super::{Credits, LedgerDomainError, ParseTransactionKindError, ParseTransactionStatusError};
use super::{TransactionId, UserId};
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Classification of a fund movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Escrowed payment for an assigned task.
    TaskPayment,
    /// User-to-user credit transfer.
    DirectTransfer,
    /// Credits granted by the system (account seeding).
    SystemCredit,
    /// Escrow returned to a task creator.
    Refund,
    /// Fund movement ordered by a dispute resolution.
    DisputeResolution,
}

impl TransactionKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskPayment => "task_payment",
            Self::DirectTransfer => "direct_transfer",
            Self::SystemCredit => "system_credit",
            Self::Refund => "refund",
            Self::DisputeResolution => "dispute_resolution",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = ParseTransactionKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "task_payment" => Ok(Self::TaskPayment),
            "direct_transfer" => Ok(Self::DirectTransfer),
            "system_credit" => Ok(Self::SystemCredit),
            "refund" => Ok(Self::Refund),
            "dispute_resolution" => Ok(Self::DisputeResolution),
            _ => Err(ParseTransactionKindError(value.to_owned())),
        }
    }
}

/// Lifecycle status of a transaction record.
///
/// `Pending` is the only non-terminal status; a record may receive exactly
/// one terminal update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Funds are held in escrow awaiting an outcome.
    Pending,
    /// The movement finished as recorded.
    Completed,
    /// The movement failed before completion.
    Failed,
    /// The movement was abandoned and will never complete.
    Cancelled,
}

impl TransactionStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` when no further status update is permitted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns `true` when a record in this status may move to `to`.
    ///
    /// The only legal updates are `Pending` to a terminal status; terminal
    /// records are immutable.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(self, Self::Pending) && to.is_terminal()
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = ParseTransactionStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseTransactionStatusError(value.to_owned())),
        }
    }
}

/// An append-only record of a single fund movement.
///
/// Records are immutable once written except for the single terminal status
/// update tied to the task or transfer that caused them. Every balance
/// mutation in the system is paired with a record so ledger state can be
/// reconstructed and verified independently of balances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    from_user: Option<UserId>,
    to_user: Option<UserId>,
    task: Option<TaskId>,
    amount: Credits,
    kind: TransactionKind,
    status: TransactionStatus,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

/// Parameter object describing a transaction to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// Account debited, when the movement has a source account.
    pub from_user: Option<UserId>,
    /// Account credited, when the movement has a destination account.
    pub to_user: Option<UserId>,
    /// Task the movement settles, if any.
    pub task: Option<TaskId>,
    /// Amount moved; must be positive.
    pub amount: Credits,
    /// Classification of the movement.
    pub kind: TransactionKind,
    /// Initial status.
    pub status: TransactionStatus,
    /// Free-form annotation carried on transfers.
    pub notes: Option<String>,
}

impl Transaction {
    /// Creates a transaction record with a fresh identifier and the current
    /// timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerDomainError::ZeroAmount`] when the amount is zero.
    pub fn new(fields: NewTransaction, clock: &impl Clock) -> Result<Self, LedgerDomainError> {
        if fields.amount.is_zero() {
            return Err(LedgerDomainError::ZeroAmount);
        }
        Ok(Self {
            id: TransactionId::new(),
            from_user: fields.from_user,
            to_user: fields.to_user,
            task: fields.task,
            amount: fields.amount,
            kind: fields.kind,
            status: fields.status,
            notes: fields.notes,
            created_at: clock.utc(),
        })
    }

    /// Returns the record identifier.
    #[must_use]
    pub const fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the debited account, if any.
    #[must_use]
    pub const fn from_user(&self) -> Option<UserId> {
        self.from_user
    }

    /// Returns the credited account, if any.
    #[must_use]
    pub const fn to_user(&self) -> Option<UserId> {
        self.to_user
    }

    /// Returns the task this record settles, if any.
    #[must_use]
    pub const fn task(&self) -> Option<TaskId> {
        self.task
    }

    /// Returns the amount moved.
    #[must_use]
    pub const fn amount(&self) -> Credits {
        self.amount
    }

    /// Returns the movement classification.
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Returns the annotation, if any.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Applies the single permitted terminal status update.
    ///
    /// Returns the previous status on success so callers can log the
    /// transition.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidStatusUpdate`] when the record is already terminal
    /// or `to` is not a terminal status.
    pub fn update_status(&mut self, to: TransactionStatus) -> Result<TransactionStatus, InvalidStatusUpdate> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidStatusUpdate {
                id: self.id,
                from: self.status,
                to,
            });
        }
        let previous = self.status;
        self.status = to;
        Ok(previous)
    }
}

/// Error returned when a transaction status update is not permitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transaction {id}: illegal status update {} -> {}", from.as_str(), to.as_str())]
pub struct InvalidStatusUpdate {
    /// The record that rejected the update.
    pub id: TransactionId,
    /// Status at the time of the attempt.
    pub from: TransactionStatus,
    /// Requested status.
    pub to: TransactionStatus,
}
