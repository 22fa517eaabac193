//! Opening-Range Breakout
//!
//! Trades closes beyond the opening range, inside a fixed eligibility
//! window after the range has finished forming. The stop sits on the
//! opposite side of the range, so range size bounds the trade risk.

use crate::domain::candle::Candle;
use crate::domain::session::SessionConfig;
use crate::domain::signal::{Direction, StrategySignal};
use crate::indicators::IndicatorSnapshot;

use super::params::BreakoutConfig;

pub const STRATEGY_NAME: &str = "breakout";

const BASE_CONFIDENCE: f64 = 70.0;
const VOLUME_BONUS: f64 = 10.0;
const CLEAN_BREAK_BONUS: f64 = 5.0;
const STRONG_BODY_BONUS: f64 = 5.0;

pub fn generate(
    candles: &[Candle],
    snapshot: &IndicatorSnapshot,
    config: &BreakoutConfig,
    session: &SessionConfig,
) -> Option<StrategySignal> {
    let last = candles.last()?;

    // Disabled outside the eligibility window and while the range forms
    let local = session.local_time(last.time);
    if local < config.eligible_from || local > config.eligible_until {
        return None;
    }
    if session.in_opening_range_formation(last.time) {
        return None;
    }

    let or_high = snapshot.levels.opening_range_high?;
    let or_low = snapshot.levels.opening_range_low?;
    let range = or_high - or_low;
    if snapshot.atr <= 0.0 || range < config.min_range_atr_multiple * snapshot.atr {
        return None;
    }

    let (direction, stop_loss, opposing_wick) = if last.close > or_high {
        (Direction::Long, or_low, last.close.min(last.open) - last.low)
    } else if last.close < or_low {
        (Direction::Short, or_high, last.high - last.close.max(last.open))
    } else {
        return None;
    };

    let mut confidence = BASE_CONFIDENCE;
    let volume_confirmed = snapshot.relative_volume >= config.volume_confirmation;
    if volume_confirmed {
        confidence += VOLUME_BONUS;
    }
    let bar_range = last.range();
    if bar_range > 0.0 && opposing_wick / bar_range <= config.clean_break_wick_ratio {
        confidence += CLEAN_BREAK_BONUS;
    }
    if bar_range > 0.0 && last.body() / bar_range >= config.strong_body_ratio {
        confidence += STRONG_BODY_BONUS;
    }

    let entry = last.close;
    let take_profit = match direction {
        Direction::Long => entry + range * config.target_range_multiple,
        _ => entry - range * config.target_range_multiple,
    };

    Some(StrategySignal {
        direction,
        confidence: confidence.clamp(0.0, 100.0),
        entry,
        stop_loss,
        take_profit,
        strategy_name: STRATEGY_NAME,
        rationale: format!(
            "{} break of opening range {:.2}-{:.2} ({:.1} pts), rel vol {:.2}",
            direction, or_low, or_high, range, snapshot.relative_volume
        ),
    })
}
