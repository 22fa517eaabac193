//! EMA Trend Pullback
//!
//! Joins an established trend on an RSI retracement toward the fast EMA.
//! The pullback bands are asymmetric by direction: longs buy RSI dips
//! into 40-55, shorts sell RSI pops into 45-60.

use crate::domain::signal::{Direction, StrategySignal};
use crate::indicators::IndicatorSnapshot;

use super::params::TrendPullbackConfig;

pub const STRATEGY_NAME: &str = "trend_pullback";

const BASE_CONFIDENCE: f64 = 65.0;
const NEAR_EMA_BONUS: f64 = 15.0;
const STRONG_ADX_BONUS: f64 = 10.0;
const STRONG_TREND_BONUS: f64 = 5.0;

/// Composite trend strength, 0-100: ADX magnitude, DI separation, and
/// EMA stack alignment each contribute a capped share.
pub fn trend_strength(snapshot: &IndicatorSnapshot) -> f64 {
    let adx_component = snapshot.adx.min(50.0);
    let di_spread = (snapshot.plus_di - snapshot.minus_di).abs().min(25.0);
    let aligned = (snapshot.ema9 > snapshot.ema20 && snapshot.ema20 > snapshot.ema50)
        || (snapshot.ema9 < snapshot.ema20 && snapshot.ema20 < snapshot.ema50);
    let alignment_component = if aligned { 25.0 } else { 0.0 };
    adx_component + di_spread + alignment_component
}

pub fn generate(
    snapshot: &IndicatorSnapshot,
    config: &TrendPullbackConfig,
) -> Option<StrategySignal> {
    if snapshot.atr <= 0.0 || snapshot.adx < config.min_adx {
        return None;
    }
    let strength = trend_strength(snapshot);
    if strength < config.min_trend_strength {
        return None;
    }

    let direction = if snapshot.ema9 > snapshot.ema50 {
        Direction::Long
    } else if snapshot.ema9 < snapshot.ema50 {
        Direction::Short
    } else {
        return None;
    };

    let in_pullback_band = match direction {
        Direction::Long => {
            snapshot.rsi >= config.long_rsi_low && snapshot.rsi <= config.long_rsi_high
        }
        _ => snapshot.rsi >= config.short_rsi_low && snapshot.rsi <= config.short_rsi_high,
    };
    if !in_pullback_band {
        return None;
    }

    let price = snapshot.last_close;
    let mut confidence = BASE_CONFIDENCE;
    let near_fast_ema = (price - snapshot.ema9).abs() <= 0.5 * snapshot.atr;
    if near_fast_ema {
        confidence += NEAR_EMA_BONUS;
    }
    if snapshot.adx >= config.strong_adx {
        confidence += STRONG_ADX_BONUS;
    }
    if strength >= config.strong_trend_strength {
        confidence += STRONG_TREND_BONUS;
    }

    let stop_distance = config.stop_atr_multiple * snapshot.atr;
    let target_distance = config.target_atr_multiple * snapshot.atr;
    let (stop_loss, take_profit) = match direction {
        Direction::Long => (price - stop_distance, price + target_distance),
        _ => (price + stop_distance, price - target_distance),
    };

    Some(StrategySignal {
        direction,
        confidence: confidence.clamp(0.0, 100.0),
        entry: price,
        stop_loss,
        take_profit,
        strategy_name: STRATEGY_NAME,
        rationale: format!(
            "{} pullback in trend (ADX {:.1}, strength {:.0}, RSI {:.1}{})",
            direction,
            snapshot.adx,
            strength,
            snapshot.rsi,
            if near_fast_ema { ", at fast EMA" } else { "" }
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uptrend_pullback() -> IndicatorSnapshot {
        let mut snapshot = IndicatorSnapshot::neutral(100.0);
        snapshot.atr = 2.0;
        snapshot.adx = 30.0;
        snapshot.plus_di = 30.0;
        snapshot.minus_di = 12.0;
        snapshot.ema9 = 100.2;
        snapshot.ema20 = 99.5;
        snapshot.ema50 = 98.0;
        snapshot.rsi = 48.0;
        snapshot.last_close = 100.0;
        snapshot
    }

    #[test]
    fn test_long_pullback_signal() {
        let snapshot = uptrend_pullback();
        let signal = generate(&snapshot, &TrendPullbackConfig::default()).unwrap();

        assert_eq!(signal.direction, Direction::Long);
        // 65 + 15 near-EMA (strength 30+18+25=73 >= 60 earns +5 too)
        assert_eq!(signal.confidence, 85.0);
        assert_eq!(signal.stop_loss, 96.0);
        assert_eq!(signal.take_profit, 108.0);
    }

    #[test]
    fn test_weak_adx_filtered() {
        let mut snapshot = uptrend_pullback();
        snapshot.adx = 18.0;
        assert!(generate(&snapshot, &TrendPullbackConfig::default()).is_none());
    }

    #[test]
    fn test_rsi_outside_band_filtered() {
        let mut snapshot = uptrend_pullback();
        snapshot.rsi = 65.0; // no retracement yet
        assert!(generate(&snapshot, &TrendPullbackConfig::default()).is_none());
    }

    #[test]
    fn test_short_uses_short_band() {
        let mut snapshot = uptrend_pullback();
        snapshot.ema9 = 97.8;
        snapshot.ema20 = 98.5;
        snapshot.ema50 = 100.0;
        snapshot.plus_di = 12.0;
        snapshot.minus_di = 30.0;
        snapshot.rsi = 58.0; // inside the short band, outside the long band
        snapshot.last_close = 98.0;

        let signal = generate(&snapshot, &TrendPullbackConfig::default()).unwrap();
        assert_eq!(signal.direction, Direction::Short);
        assert!(signal.stop_loss > signal.entry);
        assert!(signal.take_profit < signal.entry);
    }

    #[test]
    fn test_strong_adx_bonus() {
        let mut snapshot = uptrend_pullback();
        snapshot.adx = 38.0;
        let signal = generate(&snapshot, &TrendPullbackConfig::default()).unwrap();
        assert_eq!(signal.confidence, 95.0);
    }

    #[test]
    fn test_trend_strength_components() {
        let snapshot = uptrend_pullback();
        // 30 ADX + 18 DI spread + 25 alignment
        assert!((trend_strength(&snapshot) - 73.0).abs() < 1e-9);

        let flat = IndicatorSnapshot::neutral(100.0);
        assert!(trend_strength(&flat) < 40.0);
    }
}
