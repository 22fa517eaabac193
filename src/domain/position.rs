//! Positions
//!
//! The open-trade model: at most one open position per instrument, plus the
//! companion [`AdvancedPositionState`] that tracks partial exits and
//! trailing-stop state across evaluation cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::signal::Direction;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("Invalid contract count: {0}")]
    InvalidContracts(u32),
    #[error("Invalid entry price: {0}")]
    InvalidEntryPrice(f64),
    #[error("Stop loss {stop} on the wrong side of entry {entry} for {direction}")]
    StopOnWrongSide {
        direction: Direction,
        entry: f64,
        stop: f64,
    },
}

/// An open trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub contracts: u32,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub entry_time: DateTime<Utc>,
}

impl Position {
    pub fn new(
        symbol: String,
        direction: Direction,
        entry_price: f64,
        contracts: u32,
        stop_loss: f64,
        take_profit: f64,
        entry_time: DateTime<Utc>,
    ) -> Result<Self, PositionError> {
        if contracts == 0 {
            return Err(PositionError::InvalidContracts(contracts));
        }
        if entry_price <= 0.0 {
            return Err(PositionError::InvalidEntryPrice(entry_price));
        }
        let stop_ok = match direction {
            Direction::Long => stop_loss < entry_price,
            Direction::Short => stop_loss > entry_price,
            Direction::Flat => false,
        };
        if !stop_ok {
            return Err(PositionError::StopOnWrongSide {
                direction,
                entry: entry_price,
                stop: stop_loss,
            });
        }
        Ok(Self {
            symbol,
            direction,
            entry_price,
            contracts,
            stop_loss,
            take_profit,
            entry_time,
        })
    }

    /// Signed profit in points per contract at the given price
    pub fn profit_points(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.direction.sign()
    }

    /// Distance from entry to the take-profit target, in points
    pub fn target_distance(&self) -> f64 {
        (self.take_profit - self.entry_price).abs()
    }

    /// Distance from entry to the initial stop, in points
    pub fn initial_risk_points(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }
}

/// What to do with the stop when a scale-out level fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopAction {
    /// Move the stop to entry plus the configured breakeven offset
    Breakeven,
    /// Pin the stop to the raw entry price
    Entry,
    /// Activate the trailing stop and seed its price
    Trail,
}

/// One row of the partial take-profit plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScaleOutLevel {
    /// Fraction of the target distance at which this level fires (e.g. 0.5)
    pub target_ratio: f64,
    /// Percent of the original contracts to exit (e.g. 50.0)
    pub exit_percent: f64,
    pub stop_action: StopAction,
}

/// A partial exit that has been applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialExit {
    pub contracts: u32,
    pub price: f64,
    pub time: DateTime<Utc>,
    /// Index into the scale-out plan that produced this exit
    pub level_index: usize,
}

/// Companion lifecycle state for an open position.
/// Created on entry, torn down when remaining contracts reach zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedPositionState {
    pub original_contracts: u32,
    pub remaining_contracts: u32,
    pub partial_exits: Vec<PartialExit>,
    pub trailing_active: bool,
    pub trailing_price: Option<f64>,
    /// Most favorable price seen since entry
    pub extreme_price: f64,
    /// Indices of scale-out levels that already fired (idempotency)
    pub triggered_levels: Vec<usize>,
    /// ATR at entry time, used for trailing distances
    pub entry_atr: f64,
    /// Current profit expressed as a multiple of the initial risk
    pub r_multiple: f64,
}

impl AdvancedPositionState {
    pub fn open(position: &Position, entry_atr: f64) -> Self {
        Self {
            original_contracts: position.contracts,
            remaining_contracts: position.contracts,
            partial_exits: Vec::new(),
            trailing_active: false,
            trailing_price: None,
            extreme_price: position.entry_price,
            triggered_levels: Vec::new(),
            entry_atr,
            r_multiple: 0.0,
        }
    }

    /// Contracts accounted for across partial exits plus the remainder.
    /// Invariant: always equals `original_contracts`.
    pub fn accounted_contracts(&self) -> u32 {
        self.partial_exits.iter().map(|e| e.contracts).sum::<u32>() + self.remaining_contracts
    }

    pub fn is_closed(&self) -> bool {
        self.remaining_contracts == 0
    }

    pub fn level_triggered(&self, index: usize) -> bool {
        self.triggered_levels.contains(&index)
    }

    /// Record a partial exit, clamping so remaining contracts never go
    /// negative.
    pub fn apply_partial_exit(
        &mut self,
        level_index: usize,
        requested: u32,
        price: f64,
        time: DateTime<Utc>,
    ) -> u32 {
        let contracts = requested.min(self.remaining_contracts);
        if contracts == 0 {
            return 0;
        }
        self.remaining_contracts -= contracts;
        self.partial_exits.push(PartialExit {
            contracts,
            price,
            time,
            level_index,
        });
        self.triggered_levels.push(level_index);
        contracts
    }

    /// Track the most favorable price seen since entry
    pub fn update_extreme(&mut self, price: f64, direction: Direction) {
        match direction {
            Direction::Long => {
                if price > self.extreme_price {
                    self.extreme_price = price;
                }
            }
            Direction::Short => {
                if price < self.extreme_price {
                    self.extreme_price = price;
                }
            }
            Direction::Flat => {}
        }
    }
}
