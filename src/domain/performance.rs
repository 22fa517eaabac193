//! Performance Tracker
//!
//! Records closed-trade outcomes and feeds streaks and drawdown back into
//! the adaptive thresholds and the position sizer on the next cycle.
//! Mutated only by [`PerformanceTracker::record_trade`]; everything else
//! reads it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use super::regime::MarketRegime;
use super::session::TradingSession;

/// Bound on the recent-trade ring
pub const RECENT_TRADE_CAPACITY: usize = 20;

/// One closed trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeResult {
    pub pnl: f64,
    pub regime: MarketRegime,
    pub session: TradingSession,
    pub closed_at: DateTime<Utc>,
}

/// Win/loss tally for one regime or session bucket
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WinLossTally {
    pub wins: u32,
    pub losses: u32,
}

impl WinLossTally {
    pub fn win_rate(&self) -> f64 {
        let total = self.wins + self.losses;
        if total == 0 {
            return 0.0;
        }
        self.wins as f64 / total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceTracker {
    pub consecutive_wins: u32,
    pub consecutive_losses: u32,
    pub daily_pnl: f64,
    /// 0 when daily P&L is non-negative, else |dailyPnL| / maxDrawdown x 100
    pub current_drawdown_percent: f64,
    /// Dollar drawdown reference used to express the percent above
    pub max_drawdown_dollars: f64,
    /// Ring of the most recent closed trades, newest last
    pub recent_trades: VecDeque<TradeResult>,
    pub by_regime: HashMap<MarketRegime, WinLossTally>,
    pub by_session: HashMap<TradingSession, WinLossTally>,
}

impl PerformanceTracker {
    pub fn new(max_drawdown_dollars: f64) -> Self {
        Self {
            consecutive_wins: 0,
            consecutive_losses: 0,
            daily_pnl: 0.0,
            current_drawdown_percent: 0.0,
            max_drawdown_dollars,
            recent_trades: VecDeque::with_capacity(RECENT_TRADE_CAPACITY),
            by_regime: HashMap::new(),
            by_session: HashMap::new(),
        }
    }

    /// Record one closed trade. A positive P&L counts as a win and resets
    /// the loss streak; anything else counts as a loss and resets the win
    /// streak.
    pub fn record_trade(
        &mut self,
        pnl: f64,
        regime: MarketRegime,
        session: TradingSession,
        closed_at: DateTime<Utc>,
    ) {
        let won = pnl > 0.0;
        if won {
            self.consecutive_wins += 1;
            self.consecutive_losses = 0;
        } else {
            self.consecutive_losses += 1;
            self.consecutive_wins = 0;
        }

        self.daily_pnl += pnl;
        self.current_drawdown_percent = if self.daily_pnl >= 0.0 || self.max_drawdown_dollars <= 0.0
        {
            0.0
        } else {
            self.daily_pnl.abs() / self.max_drawdown_dollars * 100.0
        };

        let regime_tally = self.by_regime.entry(regime).or_default();
        let session_tally = self.by_session.entry(session).or_default();
        if won {
            regime_tally.wins += 1;
            session_tally.wins += 1;
        } else {
            regime_tally.losses += 1;
            session_tally.losses += 1;
        }

        if self.recent_trades.len() == RECENT_TRADE_CAPACITY {
            self.recent_trades.pop_front();
        }
        self.recent_trades.push_back(TradeResult {
            pnl,
            regime,
            session,
            closed_at,
        });

        tracing::info!(
            pnl,
            ?regime,
            ?session,
            wins = self.consecutive_wins,
            losses = self.consecutive_losses,
            daily_pnl = self.daily_pnl,
            recent_win_rate = self.recent_win_rate(),
            "trade recorded"
        );
    }

    /// Clear only the daily P&L and drawdown percent. Streaks and the
    /// historical tallies persist across days.
    pub fn reset_daily_performance(&mut self) {
        self.daily_pnl = 0.0;
        self.current_drawdown_percent = 0.0;
    }

    /// Win rate over the recent-trade ring, percent
    pub fn recent_win_rate(&self) -> f64 {
        if self.recent_trades.is_empty() {
            return 0.0;
        }
        let wins = self.recent_trades.iter().filter(|t| t.pnl > 0.0).count();
        wins as f64 / self.recent_trades.len() as f64 * 100.0
    }

    /// Gross profit over gross loss across the recent-trade ring.
    /// Zero gross loss with positive gross profit yields +Infinity, the
    /// documented sentinel, never NaN.
    pub fn profit_factor(&self) -> f64 {
        let mut gross_profit = 0.0;
        let mut gross_loss = 0.0;
        for trade in &self.recent_trades {
            if trade.pnl > 0.0 {
                gross_profit += trade.pnl;
            } else {
                gross_loss += trade.pnl.abs();
            }
        }
        if gross_loss == 0.0 {
            if gross_profit > 0.0 {
                f64::INFINITY
            } else {
                0.0
            }
        } else {
            gross_profit / gross_loss
        }
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new(4000.0)
    }
}
