//! Execution port.
//!
//! Accepts a sized, risk-approved trade and reports success or failure.
//! The engine never retries a failed execution and never assumes a trade
//! happened: position and performance state mutate only after the caller
//! confirms a fill.

use thiserror::Error;

use crate::domain::signal::Direction;
use crate::engine::TradeIntent;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Order rejected: {0}")]
    Rejected(String),
    #[error("Connection failure: {0}")]
    Connection(String),
    #[error("Order timed out")]
    Timeout,
}

/// A confirmed fill
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub fill_price: f64,
    pub filled_contracts: u32,
}

#[cfg_attr(test, mockall::automock)]
pub trait ExecutionPort {
    /// Submit an entry order for a trade intent
    fn execute_entry(&self, intent: &TradeIntent) -> Result<ExecutionReport, ExecutionError>;

    /// Submit an exit order closing `contracts` of an open position
    fn execute_exit(
        &self,
        symbol: &str,
        direction: Direction,
        contracts: u32,
    ) -> Result<ExecutionReport, ExecutionError>;
}
