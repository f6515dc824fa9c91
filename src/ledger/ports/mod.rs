//! Port contracts for the credit ledger.
//!
//! Ports define infrastructure-agnostic interfaces used by ledger services
//! and the escrow engine.

pub mod store;

pub use store::{LedgerStore, LedgerStoreError, LedgerStoreResult};
