//! Adapter implementations of ledger ports.

pub mod memory;

pub use memory::InMemoryLedger;
