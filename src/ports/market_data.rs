//! Market data and account feed ports.
//!
//! The engine is synchronous: the caller fetches everything before a
//! cycle runs, so these traits are plain blocking calls.

use thiserror::Error;

use crate::domain::candle::Candle;

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Feed unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed payload: {0}")]
    Malformed(String),
    #[error("Not enough history: need {required}, got {got}")]
    NotEnoughHistory { required: usize, got: usize },
}

/// Ordered OHLCV candle feed
#[cfg_attr(test, mockall::automock)]
pub trait MarketDataPort {
    /// Most recent `limit` candles for a symbol, oldest first
    fn fetch_candles(&self, symbol: &str, limit: usize) -> Result<Vec<Candle>, MarketDataError>;
}

/// Current account P&L and open exposure
#[derive(Debug, Clone, Default)]
pub struct AccountSnapshot {
    /// Realized P&L for the current trading day, dollars
    pub realized_daily_pnl: f64,
    /// Unrealized P&L on open positions, dollars
    pub unrealized_pnl: f64,
    /// Notional exposure by symbol, dollars
    pub exposures: Vec<(String, f64)>,
}

#[cfg_attr(test, mockall::automock)]
pub trait AccountPort {
    fn snapshot(&self) -> Result<AccountSnapshot, MarketDataError>;
}
