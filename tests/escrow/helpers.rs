//! Shared helpers for escrow integration tests.

use creata::exchange::{ExchangeConfig, TaskExchange};
use creata::ledger::domain::{Credits, UserId};
use creata::task::services::CreateTaskRequest;
use eyre::{Result, WrapErr};
use rstest::fixture;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Starting balance used across the integration suite.
pub const STARTING_BALANCE: u64 = 50;

static TRACING: Once = Once::new();

/// Provides a fresh exchange with default configuration.
///
/// The first use per binary installs an env-filtered subscriber, so
/// `RUST_LOG` surfaces the engine's logs during a test run.
#[fixture]
pub fn exchange() -> TaskExchange {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
    TaskExchange::new(ExchangeConfig::default())
}

/// Registers a user and returns their identifier.
///
/// # Errors
///
/// Returns an error when registration fails.
pub async fn register(exchange: &TaskExchange, name: &str) -> Result<UserId> {
    exchange
        .register_user(name, None)
        .await
        .wrap_err_with(|| format!("registering {name}"))
}

/// A creation request for the standard fixture task.
#[must_use]
pub fn fence_task(creator: UserId, price: u64) -> CreateTaskRequest {
    CreateTaskRequest {
        creator,
        title: "Fix the garden fence".to_owned(),
        description: "Two panels came loose in the storm".to_owned(),
        price: Credits::new(price),
        skills: vec!["carpentry".to_owned()],
    }
}

/// Sums every registered balance.
///
/// # Errors
///
/// Returns an error when a balance cannot be read.
pub async fn total_balances(exchange: &TaskExchange, users: &[UserId]) -> Result<u64> {
    let mut total = 0;
    for user in users {
        total += exchange
            .balance_of(*user)
            .await
            .wrap_err("reading balance")?
            .value();
    }
    Ok(total)
}
