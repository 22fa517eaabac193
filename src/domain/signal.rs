//! Trading Signals
//!
//! Per-strategy candidate signals and the aggregated master signal the
//! confluence layer produces. Signals are value types: each strategy builds
//! its own and never mutates another's.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
    Flat,
}

impl Direction {
    /// Sign multiplier for P&L math: +1 long, -1 short, 0 flat
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
            Direction::Flat => 0.0,
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
            Direction::Flat => Direction::Flat,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
            Direction::Flat => write!(f, "FLAT"),
        }
    }
}

/// Reporting-only strength band derived from confidence.
/// Never used for gating decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalStrength {
    Strong,
    Moderate,
    Weak,
    None,
}

impl SignalStrength {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 85.0 {
            SignalStrength::Strong
        } else if confidence >= 70.0 {
            SignalStrength::Moderate
        } else if confidence >= 55.0 {
            SignalStrength::Weak
        } else {
            SignalStrength::None
        }
    }
}

/// A candidate trade from a single strategy
#[derive(Debug, Clone, Serialize)]
pub struct StrategySignal {
    pub direction: Direction,
    /// 0-100
    pub confidence: f64,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub strategy_name: &'static str,
    pub rationale: String,
}

impl StrategySignal {
    pub fn strength(&self) -> SignalStrength {
        SignalStrength::from_confidence(self.confidence)
    }

    /// Reward-to-risk ratio; 0 when the stop distance is degenerate
    pub fn risk_reward(&self) -> f64 {
        let risk = (self.entry - self.stop_loss).abs();
        if risk <= f64::EPSILON {
            return 0.0;
        }
        (self.take_profit - self.entry).abs() / risk
    }
}

/// Aggregate of agreeing strategy signals
#[derive(Debug, Clone, Serialize)]
pub struct MasterSignal {
    pub direction: Direction,
    /// Strategy-weight-weighted average confidence of agreeing signals, 0-100
    pub confidence: f64,
    /// Reporting band for the merged confidence
    pub strength: SignalStrength,
    /// Degree of strategy agreement, 0-100
    pub confluence_score: f64,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// 1.5 / 1.0 / 0.5 from the confluence tier
    pub position_size_multiplier: f64,
    /// Names of the strategies that agreed with the majority direction
    pub contributors: Vec<&'static str>,
}

impl MasterSignal {
    /// A do-nothing master signal
    pub fn flat() -> Self {
        Self {
            direction: Direction::Flat,
            confidence: 0.0,
            strength: SignalStrength::None,
            confluence_score: 0.0,
            entry: 0.0,
            stop_loss: 0.0,
            take_profit: 0.0,
            position_size_multiplier: 0.0,
            contributors: Vec::new(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.direction == Direction::Flat
    }

    pub fn risk_reward(&self) -> f64 {
        let risk = (self.entry - self.stop_loss).abs();
        if risk <= f64::EPSILON {
            return 0.0;
        }
        (self.take_profit - self.entry).abs() / risk
    }
}
