//! VWAP Mean Reversion
//!
//! Fades stretched moves back toward VWAP: long when price trades more
//! than one ATR below VWAP with a washed-out RSI, symmetric for shorts.
//! The target is always VWAP itself, so the reward shrinks as price
//! reverts and the strategy naturally stops firing near the mean.

use crate::domain::signal::{Direction, StrategySignal};
use crate::indicators::IndicatorSnapshot;

use super::params::MeanReversionConfig;

pub const STRATEGY_NAME: &str = "mean_reversion";

const BASE_CONFIDENCE: f64 = 60.0;
const MAX_DISTANCE_BONUS: f64 = 25.0;
const EXTREME_RSI_BONUS: f64 = 10.0;
const RISK_REWARD_PENALTY: f64 = 20.0;

pub fn generate(
    snapshot: &IndicatorSnapshot,
    config: &MeanReversionConfig,
) -> Option<StrategySignal> {
    if snapshot.atr <= 0.0 {
        return None;
    }
    let price = snapshot.last_close;
    let distance_atr = (price - snapshot.vwap).abs() / snapshot.atr;

    let direction = if price < snapshot.vwap - config.atr_distance * snapshot.atr
        && snapshot.rsi < config.rsi_oversold
    {
        Direction::Long
    } else if price > snapshot.vwap + config.atr_distance * snapshot.atr
        && snapshot.rsi > config.rsi_overbought
    {
        Direction::Short
    } else {
        return None;
    };

    let mut confidence = BASE_CONFIDENCE + MAX_DISTANCE_BONUS.min(distance_atr * 10.0);
    let extreme_rsi =
        snapshot.rsi < config.rsi_extreme_low || snapshot.rsi > config.rsi_extreme_high;
    if extreme_rsi {
        confidence += EXTREME_RSI_BONUS;
    }

    let stop_distance = config.stop_atr_multiple * snapshot.atr;
    let stop_loss = match direction {
        Direction::Long => price - stop_distance,
        _ => price + stop_distance,
    };
    let take_profit = snapshot.vwap;

    let reward = (take_profit - price).abs();
    let risk_reward = if stop_distance > 0.0 {
        reward / stop_distance
    } else {
        0.0
    };
    if risk_reward < config.min_risk_reward {
        confidence -= RISK_REWARD_PENALTY;
    }
    confidence = confidence.clamp(0.0, 100.0);

    Some(StrategySignal {
        direction,
        confidence,
        entry: price,
        stop_loss,
        take_profit,
        strategy_name: STRATEGY_NAME,
        rationale: format!(
            "{} {:.1} ATR from VWAP {:.2}, RSI {:.1}{}",
            direction,
            distance_atr,
            snapshot.vwap,
            snapshot.rsi,
            if extreme_rsi { " (extreme)" } else { "" }
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stretched_long(distance_atr: f64, rsi: f64) -> IndicatorSnapshot {
        let mut snapshot = IndicatorSnapshot::neutral(100.0);
        snapshot.atr = 2.0;
        snapshot.vwap = 100.0;
        snapshot.last_close = 100.0 - distance_atr * snapshot.atr;
        snapshot.rsi = rsi;
        snapshot
    }

    #[test]
    fn test_no_signal_near_vwap() {
        let snapshot = stretched_long(0.5, 25.0);
        assert!(generate(&snapshot, &MeanReversionConfig::default()).is_none());
    }

    #[test]
    fn test_no_signal_without_rsi_confirmation() {
        let snapshot = stretched_long(1.5, 45.0);
        assert!(generate(&snapshot, &MeanReversionConfig::default()).is_none());
    }

    #[test]
    fn test_stretched_long_with_extreme_rsi() {
        // Two ATRs below VWAP, RSI 22: 60 + 20 + 10 = 90
        let snapshot = stretched_long(2.0, 22.0);
        let signal = generate(&snapshot, &MeanReversionConfig::default()).unwrap();

        assert_eq!(signal.direction, Direction::Long);
        assert!(signal.confidence >= 90.0);
        assert_eq!(signal.take_profit, snapshot.vwap);
        assert!(signal.stop_loss < signal.entry);
    }

    #[test]
    fn test_symmetric_short() {
        let mut snapshot = IndicatorSnapshot::neutral(100.0);
        snapshot.atr = 2.0;
        snapshot.vwap = 100.0;
        snapshot.last_close = 104.0;
        snapshot.rsi = 78.0;

        let signal = generate(&snapshot, &MeanReversionConfig::default()).unwrap();
        assert_eq!(signal.direction, Direction::Short);
        assert!(signal.stop_loss > signal.entry);
        assert_eq!(signal.take_profit, 100.0);
    }

    #[test]
    fn test_distance_bonus_capped() {
        // Five ATRs away caps the distance bonus at 25
        let snapshot = stretched_long(5.0, 22.0);
        let signal = generate(&snapshot, &MeanReversionConfig::default()).unwrap();
        assert!(signal.confidence <= 95.0);
    }

    #[test]
    fn test_thin_reward_penalized() {
        // 1.2 ATR from VWAP with a 1 ATR stop: reward:risk 1.2 < 1.5
        let snapshot = stretched_long(1.2, 22.0);
        let signal = generate(&snapshot, &MeanReversionConfig::default()).unwrap();
        // 60 + 12 + 10 - 20
        assert!((signal.confidence - 62.0).abs() < 1e-9);
    }
}
