//! Port traits the surrounding application implements: candle/account
//! feeds in, execution out. All synchronous; I/O happens in the caller
//! before a cycle runs.

pub mod execution;
pub mod market_data;

pub use execution::{ExecutionError, ExecutionPort, ExecutionReport};
pub use market_data::{AccountPort, AccountSnapshot, MarketDataError, MarketDataPort};

#[cfg(test)]
pub use execution::MockExecutionPort;
#[cfg(test)]
pub use market_data::{MockAccountPort, MockMarketDataPort};
