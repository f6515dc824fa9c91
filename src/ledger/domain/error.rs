//! Error types for ledger domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing ledger domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerDomainError {
    /// A transaction amount must be positive.
    #[error("transaction amount must be greater than zero")]
    ZeroAmount,
}

/// Error returned while parsing transaction kinds from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown transaction kind: {0}")]
pub struct ParseTransactionKindError(pub String);

/// Error returned while parsing transaction statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown transaction status: {0}")]
pub struct ParseTransactionStatusError(pub String);
