//! Decision Engine
//!
//! One evaluation cycle runs the full pipeline: indicators, regime,
//! strategies, confluence, then adaptive thresholds and sizing in
//! parallel on the master signal, with the risk engine gating the final
//! trade. An open position short-circuits entry logic: the position
//! manager is evaluated first.
//!
//! The engine holds no hidden state. [`EngineContext`] is caller-owned
//! and must be serialized by the caller if cycles can race; nothing in
//! here locks.
//!
//! Trade state mutates only on confirmation: `evaluate` returns intents
//! and instructions, and the caller reports execution success through the
//! `confirm_*` methods before positions or the performance tracker
//! change.

pub mod position_manager;
pub mod sizer;
pub mod thresholds;

pub use position_manager::{
    ExitInstruction, ExitReason, PositionManagerConfig, PositionManagerConfigError,
};
pub use sizer::{SizeDecision, SizerConfig};
pub use thresholds::{RequiredThresholds, ThresholdConfig};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::candle::Candle;
use crate::domain::performance::PerformanceTracker;
use crate::domain::position::{AdvancedPositionState, Position, PositionError};
use crate::domain::regime::MarketRegime;
use crate::domain::risk::{RiskConfigError, RiskEngine, RiskLimits, RiskViolation};
use crate::domain::session::SessionConfig;
use crate::domain::signal::{Direction, MasterSignal, SignalStrength};
use crate::indicators::{IndicatorError, IndicatorSnapshot};
use crate::strategy::{self, StrategyConfigError, StrategySuiteConfig};

#[derive(Debug, Error)]
pub enum EngineConfigError {
    #[error(transparent)]
    Strategy(#[from] StrategyConfigError),
    #[error(transparent)]
    Risk(#[from] RiskConfigError),
    #[error(transparent)]
    PositionManager(#[from] PositionManagerConfigError),
    #[error("Invalid UTC offset: {0} hours")]
    InvalidUtcOffset(i32),
    #[error("Reversal confidence {0} out of [0, 100]")]
    InvalidReversalConfidence(f64),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
    #[error(transparent)]
    Position(#[from] PositionError),
}

/// Full engine configuration, assembled once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub strategies: StrategySuiteConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub sizer: SizerConfig,
    #[serde(default)]
    pub position_manager: PositionManagerConfig,
    #[serde(default)]
    pub risk_limits: RiskLimits,
    /// Minimum opposite-direction master confidence that forces a
    /// position reversal
    #[serde(default = "default_reversal_confidence")]
    pub reversal_min_confidence: f64,
}

fn default_symbol() -> String {
    "ES".to_string()
}

fn default_reversal_confidence() -> f64 {
    80.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbol: "ES".to_string(),
            session: SessionConfig::default(),
            strategies: StrategySuiteConfig::default(),
            thresholds: ThresholdConfig::default(),
            sizer: SizerConfig::default(),
            position_manager: PositionManagerConfig::default(),
            risk_limits: RiskLimits::default(),
            reversal_min_confidence: 80.0,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        self.strategies.validate()?;
        self.risk_limits.validate()?;
        self.position_manager.validate()?;
        if self.session.utc_offset_hours.abs() > 14 {
            return Err(EngineConfigError::InvalidUtcOffset(
                self.session.utc_offset_hours,
            ));
        }
        if !(0.0..=100.0).contains(&self.reversal_min_confidence) {
            return Err(EngineConfigError::InvalidReversalConfidence(
                self.reversal_min_confidence,
            ));
        }
        Ok(())
    }
}

/// A sized, risk-approved trade the caller may execute
#[derive(Debug, Clone, Serialize)]
pub struct TradeIntent {
    pub symbol: String,
    pub direction: Direction,
    pub contracts: u32,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub confluence_score: f64,
    pub confidence: f64,
    /// Reporting band for the confidence, never used for gating
    pub strength: SignalStrength,
    pub position_size_multiplier: f64,
    /// ATR at signal time, seeds the position's trailing distances
    pub entry_atr: f64,
    pub contributors: Vec<&'static str>,
    pub reasons: Vec<String>,
    pub warnings: Vec<String>,
}

/// What this cycle decided
#[derive(Debug, Clone, Serialize)]
pub enum Decision {
    /// Nothing to do; reasons explain why
    NoAction { reasons: Vec<String> },
    /// Exit instructions for the open position
    Exit { instructions: Vec<ExitInstruction> },
    /// Open a new position
    Enter(TradeIntent),
}

/// Result of one evaluation cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutput {
    pub regime: MarketRegime,
    pub decision: Decision,
    /// Risk violations raised or updated during this cycle
    pub violations: Vec<RiskViolation>,
}

/// An open position plus its lifecycle state, torn down together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenTrade {
    pub position: Position,
    pub state: AdvancedPositionState,
}

/// Caller-owned context for one trading account. Exactly one per account;
/// no process-wide state exists anywhere in the engine.
#[derive(Debug)]
pub struct EngineContext {
    config: EngineConfig,
    pub risk: RiskEngine,
    pub performance: PerformanceTracker,
    pub open_trade: Option<OpenTrade>,
}

impl EngineContext {
    pub fn new(config: EngineConfig) -> Result<Self, EngineConfigError> {
        config.validate()?;
        let risk = RiskEngine::new(config.risk_limits.clone());
        let performance = PerformanceTracker::new(config.risk_limits.max_trailing_drawdown);
        Ok(Self {
            config,
            risk,
            performance,
            open_trade: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one full evaluation cycle over the trailing candle window.
    pub fn evaluate(
        &mut self,
        candles: &[Candle],
        now: DateTime<Utc>,
    ) -> Result<CycleOutput, EngineError> {
        let snapshot = IndicatorSnapshot::compute(candles, &self.config.session)?;
        let regime = MarketRegime::classify(&snapshot);
        let price = snapshot.last_close;

        tracing::debug!(%regime, price, "evaluation cycle");

        // An open position is managed before any entry logic runs
        let open_direction = self.open_trade.as_ref().map(|t| t.position.direction);
        if let Some(direction) = open_direction {
            let instructions = match self.open_trade.as_mut() {
                Some(trade) => position_manager::check_exit_conditions(
                    &trade.position,
                    &mut trade.state,
                    price,
                    &self.config.position_manager,
                ),
                None => Vec::new(),
            };
            if !instructions.is_empty() {
                return Ok(CycleOutput {
                    regime,
                    decision: Decision::Exit { instructions },
                    violations: self.violations_at(now),
                });
            }

            // Reversal: a confident opposite master signal closes the
            // position now; re-entry is a fresh decision next cycle.
            let master = self.master_signal(candles, &snapshot);
            if master.direction == direction.opposite()
                && master.confidence >= self.config.reversal_min_confidence
            {
                tracing::info!(
                    confidence = master.confidence,
                    direction = %master.direction,
                    "reversal signal against open position"
                );
                return Ok(CycleOutput {
                    regime,
                    decision: Decision::Exit {
                        instructions: vec![ExitInstruction::Full {
                            price,
                            reason: ExitReason::Reversal,
                        }],
                    },
                    violations: self.violations_at(now),
                });
            }

            return Ok(CycleOutput {
                regime,
                decision: Decision::NoAction {
                    reasons: vec!["position open, no exit condition met".to_string()],
                },
                violations: self.violations_at(now),
            });
        }

        // Entry pipeline
        let master = self.master_signal(candles, &snapshot);
        if master.is_flat() {
            return Ok(CycleOutput {
                regime,
                decision: Decision::NoAction {
                    reasons: vec!["no strategy agreement".to_string()],
                },
                violations: self.violations_at(now),
            });
        }

        let required = thresholds::compute(
            regime,
            self.config.session.session(now),
            self.config.session.time_of_day(now),
            &self.performance,
            &self.config.thresholds,
        );
        let mut blockers = Vec::new();
        if master.confluence_score < required.confluence {
            blockers.push(format!(
                "confluence {:.0} below required {:.0}",
                master.confluence_score, required.confluence
            ));
        }
        if master.confidence < required.confidence {
            blockers.push(format!(
                "confidence {:.0} below required {:.0}",
                master.confidence, required.confidence
            ));
        }
        if master.risk_reward() < required.risk_reward {
            blockers.push(format!(
                "risk:reward {:.2} below required {:.2}",
                master.risk_reward(),
                required.risk_reward
            ));
        }
        if !blockers.is_empty() {
            return Ok(CycleOutput {
                regime,
                decision: Decision::NoAction { reasons: blockers },
                violations: self.violations_at(now),
            });
        }

        let size = sizer::size_position(
            regime,
            master.confluence_score,
            &snapshot,
            &self.performance,
            &self.config.sizer,
        );
        if size.contracts == 0 {
            return Ok(CycleOutput {
                regime,
                decision: Decision::NoAction {
                    reasons: size.reasons,
                },
                violations: self.violations_at(now),
            });
        }

        let validation = self.risk.validate_trade(
            &self.config.symbol,
            master.direction,
            size.contracts,
            master.entry,
            master.stop_loss,
            master.take_profit,
            now,
            &self.config.session,
        );
        if !validation.allowed {
            return Ok(CycleOutput {
                regime,
                decision: Decision::NoAction {
                    reasons: validation.errors,
                },
                violations: self.violations_at(now),
            });
        }

        let mut reasons = required.reasons;
        reasons.extend(size.reasons);
        let intent = TradeIntent {
            symbol: self.config.symbol.clone(),
            direction: master.direction,
            contracts: size.contracts.min(validation.max_contracts),
            entry: master.entry,
            stop_loss: validation.adjusted_stop_loss.unwrap_or(master.stop_loss),
            take_profit: master.take_profit,
            confluence_score: master.confluence_score,
            confidence: master.confidence,
            strength: master.strength,
            position_size_multiplier: master.position_size_multiplier,
            entry_atr: snapshot.atr,
            contributors: master.contributors,
            reasons,
            warnings: validation.warnings,
        };
        tracing::info!(
            direction = %intent.direction,
            contracts = intent.contracts,
            entry = intent.entry,
            confluence = intent.confluence_score,
            strength = ?intent.strength,
            "trade intent"
        );
        Ok(CycleOutput {
            regime,
            decision: Decision::Enter(intent),
            violations: self.violations_at(now),
        })
    }

    /// The caller confirms a fill for an entry intent. Only now does a
    /// Position come into existence.
    pub fn confirm_entry(
        &mut self,
        intent: &TradeIntent,
        time: DateTime<Utc>,
    ) -> Result<(), PositionError> {
        let position = Position::new(
            intent.symbol.clone(),
            intent.direction,
            intent.entry,
            intent.contracts,
            intent.stop_loss,
            intent.take_profit,
            time,
        )?;
        let state = AdvancedPositionState::open(&position, intent.entry_atr);
        self.open_trade = Some(OpenTrade { position, state });
        Ok(())
    }

    /// The caller confirms a scale-out fill. The partial exit is booked
    /// at the actual fill price and the level's stop action is applied.
    /// Returns the contracts booked, or None if no position is open.
    pub fn confirm_partial_exit(
        &mut self,
        level_index: usize,
        contracts: u32,
        fill_price: f64,
        time: DateTime<Utc>,
    ) -> Option<u32> {
        let trade = self.open_trade.as_mut()?;
        Some(position_manager::confirm_partial_exit(
            &mut trade.position,
            &mut trade.state,
            level_index,
            contracts,
            fill_price,
            time,
            &self.config.position_manager,
        ))
    }

    /// The caller confirms a full exit was executed at `price`. Realized
    /// P&L (including prior partial exits) is recorded and the position
    /// and its lifecycle state are torn down together. Returns the
    /// realized dollar P&L, or None if no position was open.
    pub fn confirm_full_exit(
        &mut self,
        price: f64,
        regime: MarketRegime,
        time: DateTime<Utc>,
    ) -> Option<f64> {
        let trade = self.open_trade.take()?;
        let point_value = self.risk.limits().point_value;
        let sign = trade.position.direction.sign();
        let mut pnl = 0.0;
        for exit in &trade.state.partial_exits {
            pnl += (exit.price - trade.position.entry_price) * sign * exit.contracts as f64;
        }
        pnl += (price - trade.position.entry_price) * sign * trade.state.remaining_contracts as f64;
        pnl *= point_value;

        let session = self.config.session.session(time);
        self.performance.record_trade(pnl, regime, session, time);
        Some(pnl)
    }

    /// Daily reset: risk engine and performance tracker together.
    pub fn reset_daily(&mut self) {
        self.risk.reset_daily();
        self.performance.reset_daily_performance();
    }

    pub fn reset_weekly(&mut self) {
        self.risk.reset_weekly();
    }

    fn master_signal(&self, candles: &[Candle], snapshot: &IndicatorSnapshot) -> MasterSignal {
        let signals = strategy::generate_all(
            candles,
            snapshot,
            &self.config.strategies,
            &self.config.session,
        );
        strategy::aggregate(&signals, &self.config.strategies.weights)
    }

    fn violations_at(&self, now: DateTime<Utc>) -> Vec<RiskViolation> {
        self.risk
            .state
            .violations
            .iter()
            .filter(|v| v.raised_at == now)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap()
    }

    #[test]
    fn test_default_config_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bad_offset_rejected() {
        let mut config = EngineConfig::default();
        config.session.utc_offset_hours = 20;
        assert!(matches!(
            config.validate(),
            Err(EngineConfigError::InvalidUtcOffset(20))
        ));
    }

    #[test]
    fn test_context_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.reversal_min_confidence = 150.0;
        assert!(EngineContext::new(config).is_err());
    }

    fn intent(contracts: u32, stop_loss: f64, take_profit: f64) -> TradeIntent {
        TradeIntent {
            symbol: "ES".to_string(),
            direction: Direction::Long,
            contracts,
            entry: 5000.0,
            stop_loss,
            take_profit,
            confluence_score: 70.0,
            confidence: 80.0,
            strength: SignalStrength::Moderate,
            position_size_multiplier: 1.0,
            entry_atr: 5.0,
            contributors: vec!["breakout"],
            reasons: Vec::new(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_confirm_entry_and_exit_round_trip() {
        let mut ctx = EngineContext::new(EngineConfig::default()).unwrap();
        let time = at();
        ctx.confirm_entry(&intent(2, 4995.0, 5010.0), time).unwrap();
        assert!(ctx.open_trade.is_some());

        // 10 points x 2 contracts x $50
        let pnl = ctx
            .confirm_full_exit(5010.0, MarketRegime::TrendStrongUp, time)
            .unwrap();
        assert_eq!(pnl, 1000.0);
        assert!(ctx.open_trade.is_none());
        assert_eq!(ctx.performance.consecutive_wins, 1);
    }

    #[test]
    fn test_confirm_exit_without_position() {
        let mut ctx = EngineContext::new(EngineConfig::default()).unwrap();
        assert!(ctx
            .confirm_full_exit(5010.0, MarketRegime::RangeWide, at())
            .is_none());
    }

    #[test]
    fn test_confirm_partial_exit_books_fill() {
        let mut ctx = EngineContext::new(EngineConfig::default()).unwrap();
        ctx.confirm_entry(&intent(4, 4990.0, 5020.0), at()).unwrap();

        let booked = ctx.confirm_partial_exit(0, 2, 5009.75, at()).unwrap();
        assert_eq!(booked, 2);

        let trade = ctx.open_trade.as_ref().unwrap();
        assert_eq!(trade.state.remaining_contracts, 2);
        assert_eq!(trade.state.partial_exits[0].price, 5009.75);
        // Level 0's stop action moves the stop to breakeven
        assert_eq!(trade.position.stop_loss, 5000.0);
    }

    #[test]
    fn test_confirm_partial_exit_without_position() {
        let mut ctx = EngineContext::new(EngineConfig::default()).unwrap();
        assert!(ctx.confirm_partial_exit(0, 2, 5010.0, at()).is_none());
    }
}
