//! Domain model for the credit ledger.
//!
//! The ledger owns balances and the append-only transaction log. Nothing
//! outside this bounded context mutates a balance; the escrow engine moves
//! funds exclusively through the [`crate::ledger::ports::LedgerStore`]
//! port.

mod amount;
mod error;
mod ids;
mod transaction;

pub use amount::Credits;
pub use error::{LedgerDomainError, ParseTransactionKindError, ParseTransactionStatusError};
pub use ids::{TransactionId, UserId};
pub use transaction::{
    InvalidStatusUpdate, NewTransaction, Transaction, TransactionKind, TransactionStatus,
};
