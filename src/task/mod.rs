//! Task lifecycle and escrow bounded context.
//!
//! Tasks move through `open -> assigned -> completed`, with cancellation
//! from `open` and a dispute detour from `assigned`. The price is escrowed
//! at assignment and released only by dual confirmation or a dispute
//! resolution; the rules live on the [`domain::Task`] aggregate and the
//! fund choreography in [`services::EscrowService`].

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
