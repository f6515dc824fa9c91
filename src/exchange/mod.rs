//! Top-level assembly of the exchange over in-memory adapters.

mod config;
mod facade;

pub use config::ExchangeConfig;
pub use facade::{ExchangeError, ExchangeResult, TaskExchange};
