//! Position Manager
//!
//! Owns the lifecycle of an open position across evaluation cycles:
//! ordered scale-out levels, breakeven/entry stop moves, and an ATR-based
//! trailing stop. The hard stop-loss and full take-profit run first and
//! always take precedence when breached.
//!
//! Scale-out levels are tracked by index: a level's instruction is
//! re-issued until the caller confirms its fill, and a confirmed level
//! never fires again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::position::{AdvancedPositionState, Position, ScaleOutLevel, StopAction};
use crate::domain::signal::Direction;

#[derive(Debug, Error)]
pub enum PositionManagerConfigError {
    #[error("Scale-out target ratio {0} out of (0, 1]")]
    InvalidTargetRatio(f64),
    #[error("Scale-out exit percent {0} out of (0, 100]")]
    InvalidExitPercent(f64),
    #[error("Scale-out levels must have ascending target ratios")]
    UnorderedLevels,
    #[error("Invalid trailing parameter: {0}")]
    InvalidTrailParameter(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionManagerConfig {
    /// Ordered partial take-profit plan
    pub scale_out_levels: Vec<ScaleOutLevel>,
    /// Trail distance behind the extreme, in entry-ATRs
    pub trail_distance_atr: f64,
    /// Minimum favorable movement, in points, before the trail price moves
    pub trail_step: f64,
    /// Unrealized profit, in entry-ATRs, that activates trailing
    pub trail_activation_atr: f64,
    /// Offset added to entry on a breakeven stop move, in points
    pub breakeven_offset: f64,
}

impl Default for PositionManagerConfig {
    fn default() -> Self {
        Self {
            scale_out_levels: vec![
                ScaleOutLevel {
                    target_ratio: 0.5,
                    exit_percent: 50.0,
                    stop_action: StopAction::Breakeven,
                },
                ScaleOutLevel {
                    target_ratio: 0.75,
                    exit_percent: 25.0,
                    stop_action: StopAction::Trail,
                },
            ],
            trail_distance_atr: 1.5,
            trail_step: 0.25,
            trail_activation_atr: 2.0,
            breakeven_offset: 0.0,
        }
    }
}

impl PositionManagerConfig {
    pub fn validate(&self) -> Result<(), PositionManagerConfigError> {
        for level in &self.scale_out_levels {
            if level.target_ratio <= 0.0 || level.target_ratio > 1.0 {
                return Err(PositionManagerConfigError::InvalidTargetRatio(
                    level.target_ratio,
                ));
            }
            if level.exit_percent <= 0.0 || level.exit_percent > 100.0 {
                return Err(PositionManagerConfigError::InvalidExitPercent(
                    level.exit_percent,
                ));
            }
        }
        for pair in self.scale_out_levels.windows(2) {
            if pair[1].target_ratio <= pair[0].target_ratio {
                return Err(PositionManagerConfigError::UnorderedLevels);
            }
        }
        for value in [
            self.trail_distance_atr,
            self.trail_step,
            self.trail_activation_atr,
        ] {
            if value <= 0.0 {
                return Err(PositionManagerConfigError::InvalidTrailParameter(value));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    HardStop,
    TakeProfit,
    TrailingStop,
    /// Closed to make way for an opposite-direction signal
    Reversal,
}

/// An exit the caller should execute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExitInstruction {
    Partial {
        level_index: usize,
        contracts: u32,
        price: f64,
    },
    Full {
        price: f64,
        reason: ExitReason,
    },
}

/// Evaluate exit conditions for one cycle. Order: hard stop / take profit
/// (precedence, early return), then scale-out, trailing update, trailing
/// activation.
pub fn check_exit_conditions(
    position: &Position,
    state: &mut AdvancedPositionState,
    price: f64,
    config: &PositionManagerConfig,
) -> Vec<ExitInstruction> {
    let direction = position.direction;

    // Hard stop and take profit always win
    let stop_breached = match direction {
        Direction::Long => price <= position.stop_loss,
        Direction::Short => price >= position.stop_loss,
        Direction::Flat => false,
    };
    if stop_breached {
        return vec![ExitInstruction::Full {
            price: position.stop_loss,
            reason: ExitReason::HardStop,
        }];
    }
    let target_hit = match direction {
        Direction::Long => price >= position.take_profit,
        Direction::Short => price <= position.take_profit,
        Direction::Flat => false,
    };
    if target_hit {
        return vec![ExitInstruction::Full {
            price: position.take_profit,
            reason: ExitReason::TakeProfit,
        }];
    }

    state.update_extreme(price, direction);
    let initial_risk = position.initial_risk_points();
    let profit = position.profit_points(price);
    state.r_multiple = if initial_risk > 0.0 {
        profit / initial_risk
    } else {
        0.0
    };

    let mut instructions = Vec::new();

    // Scale-out: only the first unconfirmed level is considered. Nothing
    // is booked here; the instruction stands, and is re-issued on the
    // next poll, until the caller confirms a fill.
    let target_distance = position.target_distance();
    if let Some((index, level)) = config
        .scale_out_levels
        .iter()
        .enumerate()
        .find(|(i, _)| !state.level_triggered(*i))
    {
        if profit >= level.target_ratio * target_distance {
            let requested = (level.exit_percent / 100.0 * state.original_contracts as f64)
                .round() as u32;
            let contracts = requested.min(state.remaining_contracts);
            if contracts > 0 {
                instructions.push(ExitInstruction::Partial {
                    level_index: index,
                    contracts,
                    price,
                });
            }
        }
    }

    // Trailing update: ratchet only, and only by at least one trail step
    if state.trailing_active {
        let candidate = trail_price(state.extreme_price, direction, state.entry_atr, config);
        match state.trailing_price {
            Some(current) => {
                let improvement = match direction {
                    Direction::Long => candidate - current,
                    _ => current - candidate,
                };
                if improvement >= config.trail_step {
                    state.trailing_price = Some(candidate);
                }
            }
            None => state.trailing_price = Some(candidate),
        }
        if let Some(trail) = state.trailing_price {
            let crossed = match direction {
                Direction::Long => price <= trail,
                Direction::Short => price >= trail,
                Direction::Flat => false,
            };
            if crossed {
                instructions.push(ExitInstruction::Full {
                    price: trail,
                    reason: ExitReason::TrailingStop,
                });
                return instructions;
            }
        }
    } else if profit >= config.trail_activation_atr * state.entry_atr {
        // Activation: seed the trail off the current extreme
        state.trailing_active = true;
        state.trailing_price = Some(trail_price(
            state.extreme_price,
            direction,
            state.entry_atr,
            config,
        ));
        tracing::debug!(trail = ?state.trailing_price, "trailing stop activated");
    }

    instructions
}

/// Book a confirmed partial fill: record the exit at the actual fill
/// price, then move the stop per the level's action. Returns the
/// contracts booked.
pub fn confirm_partial_exit(
    position: &mut Position,
    state: &mut AdvancedPositionState,
    level_index: usize,
    contracts: u32,
    fill_price: f64,
    time: DateTime<Utc>,
    config: &PositionManagerConfig,
) -> u32 {
    let exited = state.apply_partial_exit(level_index, contracts, fill_price, time);
    if exited == 0 {
        return 0;
    }
    if let Some(level) = config.scale_out_levels.get(level_index) {
        apply_stop_action(position, state, level.stop_action, config);
    }
    tracing::info!(
        level = level_index,
        contracts = exited,
        price = fill_price,
        remaining = state.remaining_contracts,
        "scale-out level filled"
    );
    exited
}

fn trail_price(
    extreme: f64,
    direction: Direction,
    entry_atr: f64,
    config: &PositionManagerConfig,
) -> f64 {
    let distance = config.trail_distance_atr * entry_atr;
    match direction {
        Direction::Short => extreme + distance,
        _ => extreme - distance,
    }
}

/// Stop moves never loosen the stop
fn apply_stop_action(
    position: &mut Position,
    state: &mut AdvancedPositionState,
    action: StopAction,
    config: &PositionManagerConfig,
) {
    let new_stop = match action {
        StopAction::Breakeven => {
            position.entry_price + config.breakeven_offset * position.direction.sign()
        }
        StopAction::Entry => position.entry_price,
        StopAction::Trail => {
            state.trailing_active = true;
            state.trailing_price = Some(trail_price(
                state.extreme_price,
                position.direction,
                state.entry_atr,
                config,
            ));
            return;
        }
    };
    let tightens = match position.direction {
        Direction::Long => new_stop > position.stop_loss,
        Direction::Short => new_stop < position.stop_loss,
        Direction::Flat => false,
    };
    if tightens {
        position.stop_loss = new_stop;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap()
    }

    fn long_position(contracts: u32) -> (Position, AdvancedPositionState) {
        let position = Position::new(
            "ES".to_string(),
            Direction::Long,
            5000.0,
            contracts,
            4990.0,
            5020.0,
            at(),
        )
        .unwrap();
        let state = AdvancedPositionState::open(&position, 5.0);
        (position, state)
    }

    #[test]
    fn test_scale_out_level_one_breakeven() {
        let (mut position, mut state) = long_position(4);
        let config = PositionManagerConfig::default();

        // Profit 10 = 0.5 x target distance 20
        let instructions = check_exit_conditions(&mut position, &mut state, 5010.0, &config);

        assert_eq!(
            instructions,
            vec![ExitInstruction::Partial {
                level_index: 0,
                contracts: 2,
                price: 5010.0
            }]
        );
        // Nothing is booked until the fill is confirmed
        assert_eq!(state.remaining_contracts, 4);
        assert_eq!(position.stop_loss, 4990.0);

        confirm_partial_exit(&mut position, &mut state, 0, 2, 5010.0, at(), &config);
        assert_eq!(state.remaining_contracts, 2);
        assert_eq!(position.stop_loss, 5000.0);
    }

    #[test]
    fn test_unconfirmed_level_reissued() {
        let (mut position, mut state) = long_position(4);
        let config = PositionManagerConfig::default();

        let first = check_exit_conditions(&mut position, &mut state, 5010.0, &config);
        let second = check_exit_conditions(&mut position, &mut state, 5010.0, &config);

        // A failed or pending fill leaves the trade untouched and the
        // same instruction comes back on the next poll
        assert_eq!(first, second);
        assert_eq!(state.remaining_contracts, 4);
        assert_eq!(position.stop_loss, 4990.0);
        assert!(state.partial_exits.is_empty());
    }

    #[test]
    fn test_confirmed_level_fires_once() {
        let (mut position, mut state) = long_position(4);
        let config = PositionManagerConfig::default();

        check_exit_conditions(&mut position, &mut state, 5010.0, &config);
        confirm_partial_exit(&mut position, &mut state, 0, 2, 5010.0, at(), &config);
        let again = check_exit_conditions(&mut position, &mut state, 5010.0, &config);

        assert!(!again
            .iter()
            .any(|i| matches!(i, ExitInstruction::Partial { level_index: 0, .. })));
        assert_eq!(state.remaining_contracts, 2);
        assert_eq!(state.accounted_contracts(), 4);
    }

    #[test]
    fn test_partial_fill_booked_at_fill_price() {
        let (mut position, mut state) = long_position(4);
        let config = PositionManagerConfig::default();

        check_exit_conditions(&mut position, &mut state, 5010.0, &config);
        // Broker fills half a point away from the evaluation price
        confirm_partial_exit(&mut position, &mut state, 0, 2, 5009.5, at(), &config);

        assert_eq!(state.partial_exits.len(), 1);
        assert_eq!(state.partial_exits[0].price, 5009.5);
    }

    #[test]
    fn test_hard_stop_precedence() {
        let (mut position, mut state) = long_position(4);
        let config = PositionManagerConfig::default();
        check_exit_conditions(&mut position, &mut state, 5010.0, &config);
        confirm_partial_exit(&mut position, &mut state, 0, 2, 5010.0, at(), &config);

        let instructions = check_exit_conditions(&mut position, &mut state, 4999.0, &config);
        assert_eq!(
            instructions,
            vec![ExitInstruction::Full {
                price: 5000.0,
                reason: ExitReason::HardStop
            }]
        );
    }

    #[test]
    fn test_take_profit_full_exit() {
        let (mut position, mut state) = long_position(2);
        let instructions = check_exit_conditions(
            &mut position,
            &mut state,
            5025.0,
            &PositionManagerConfig::default(),
        );
        assert_eq!(
            instructions,
            vec![ExitInstruction::Full {
                price: 5020.0,
                reason: ExitReason::TakeProfit
            }]
        );
    }

    #[test]
    fn test_trailing_activates_and_ratchets() {
        let (mut position, mut state) = long_position(4);
        let mut config = PositionManagerConfig::default();
        config.scale_out_levels.clear(); // isolate trailing behavior

        // Profit 10 = activation 2.0 x entryATR 5: activates, trail at 5010 - 7.5
        check_exit_conditions(&mut position, &mut state, 5010.0, &config);
        assert!(state.trailing_active);
        assert_eq!(state.trailing_price, Some(5002.5));

        // New extreme 5015 ratchets the trail up
        check_exit_conditions(&mut position, &mut state, 5015.0, &config);
        assert_eq!(state.trailing_price, Some(5007.5));

        // Pullback does not loosen it
        check_exit_conditions(&mut position, &mut state, 5011.0, &config);
        assert_eq!(state.trailing_price, Some(5007.5));
    }

    #[test]
    fn test_trailing_stop_exit() {
        let (mut position, mut state) = long_position(4);
        let mut config = PositionManagerConfig::default();
        config.scale_out_levels.clear();

        check_exit_conditions(&mut position, &mut state, 5015.0, &config);
        let instructions = check_exit_conditions(&mut position, &mut state, 5007.0, &config);

        assert_eq!(
            instructions,
            vec![ExitInstruction::Full {
                price: 5007.5,
                reason: ExitReason::TrailingStop
            }]
        );
    }

    #[test]
    fn test_small_move_below_trail_step_ignored() {
        let (mut position, mut state) = long_position(4);
        let mut config = PositionManagerConfig::default();
        config.scale_out_levels.clear();
        config.trail_step = 1.0;

        check_exit_conditions(&mut position, &mut state, 5015.0, &config);
        assert_eq!(state.trailing_price, Some(5007.5));

        // Extreme improves by 0.5, below the 1.0 step
        check_exit_conditions(&mut position, &mut state, 5015.5, &config);
        assert_eq!(state.trailing_price, Some(5007.5));
    }

    #[test]
    fn test_second_level_activates_trailing() {
        let (mut position, mut state) = long_position(4);
        let config = PositionManagerConfig::default();

        check_exit_conditions(&mut position, &mut state, 5010.0, &config);
        confirm_partial_exit(&mut position, &mut state, 0, 2, 5010.0, at(), &config);

        // Profit 15 = 0.75 x 20 fires level 2, stop action Trail
        let instructions = check_exit_conditions(&mut position, &mut state, 5015.0, &config);
        assert!(instructions
            .iter()
            .any(|i| matches!(i, ExitInstruction::Partial { level_index: 1, contracts: 1, .. })));

        confirm_partial_exit(&mut position, &mut state, 1, 1, 5015.0, at(), &config);
        assert!(state.trailing_active);
        assert_eq!(state.remaining_contracts, 1);
        assert_eq!(state.accounted_contracts(), 4);
    }

    #[test]
    fn test_short_position_trailing() {
        let position = Position::new(
            "ES".to_string(),
            Direction::Short,
            5000.0,
            2,
            5010.0,
            4980.0,
            at(),
        )
        .unwrap();
        let mut position = position;
        let mut state = AdvancedPositionState::open(&position, 5.0);
        let mut config = PositionManagerConfig::default();
        config.scale_out_levels.clear();

        // Profit 10 activates; trail at 4990 + 7.5
        check_exit_conditions(&mut position, &mut state, 4990.0, &config);
        assert!(state.trailing_active);
        assert_eq!(state.trailing_price, Some(4997.5));

        let instructions = check_exit_conditions(&mut position, &mut state, 4998.0, &config);
        assert_eq!(
            instructions,
            vec![ExitInstruction::Full {
                price: 4997.5,
                reason: ExitReason::TrailingStop
            }]
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = PositionManagerConfig::default();
        assert!(config.validate().is_ok());

        config.scale_out_levels[1].target_ratio = 0.4;
        assert!(matches!(
            config.validate(),
            Err(PositionManagerConfigError::UnorderedLevels)
        ));
    }
}
