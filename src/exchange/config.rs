//! Runtime configuration for the exchange.

use crate::ledger::domain::Credits;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_STARTING_BALANCE: Credits = Credits::new(50);
const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(2);

/// Tunable parameters for a running exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Credits granted to every freshly registered account.
    pub starting_balance: Credits,
    /// Upper bound on any single broadcast or notification delivery.
    pub dispatch_timeout: Duration,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            starting_balance: DEFAULT_STARTING_BALANCE,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }
}
