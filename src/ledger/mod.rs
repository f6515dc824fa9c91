//! Credit ledger for the task exchange.
//!
//! The ledger is the only component allowed to mutate a balance. Every
//! movement is paired with an append-only [`domain::Transaction`] record so
//! ledger state can be reconstructed and verified independently of
//! balances. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
