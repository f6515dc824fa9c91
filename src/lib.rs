//! Creata is the escrow engine of a peer task exchange: users post tasks
//! priced in credits, requesters compete to perform them, and the price
//! sits in escrow from assignment until dual confirmation or a dispute
//! resolution releases it.
//!
//! The crate is organised into bounded contexts, each with its own
//! `domain`, `ports`, `adapters`, and `services` modules:
//!
//! - [`ledger`] owns balances and the append-only transaction log.
//! - [`task`] owns the task aggregate, its lifecycle rules, and the
//!   escrow choreography.
//! - [`realtime`] tracks live sessions and pushes event frames.
//! - [`exchange`] assembles the above over in-memory adapters.
//!
//! Credits are conserved: apart from registration seeding, every movement
//! debits one place and credits another, and the sum of balances plus
//! escrowed amounts never changes.

pub mod exchange;
pub mod ledger;
pub mod realtime;
pub mod task;
