//! Order-Flow Divergence
//!
//! Looks for disagreement between the swing structure of price and the
//! swing structure of cumulative delta: price making a lower low while
//! delta makes a higher low is absorption (bullish), and the mirror is
//! distribution (bearish). Per-bar delta is volume signed by the close
//! against the open, a proxy for bid/ask traded volume.
//!
//! Stops and targets come from the nearby swing extremes, not fixed ATR
//! multiples.

use crate::domain::candle::Candle;
use crate::domain::signal::{Direction, StrategySignal};
use crate::indicators::IndicatorSnapshot;

use super::params::OrderFlowConfig;

pub const STRATEGY_NAME: &str = "order_flow";

const BASE_CONFIDENCE: f64 = 75.0;
const MAGNITUDE_BONUS: f64 = 10.0;

fn signed_delta(candle: &Candle) -> f64 {
    if candle.close > candle.open {
        candle.volume
    } else if candle.close < candle.open {
        -candle.volume
    } else {
        0.0
    }
}

/// Indices that are strict local extremes over +/- `window` bars
fn swing_points(values: &[f64], window: usize, maxima: bool) -> Vec<usize> {
    let mut points = Vec::new();
    if values.len() < window * 2 + 1 {
        return points;
    }
    for i in window..values.len() - window {
        let neighborhood = &values[i - window..=i + window];
        let is_extreme = if maxima {
            neighborhood.iter().all(|&v| v <= values[i])
                && neighborhood.iter().filter(|&&v| v == values[i]).count() == 1
        } else {
            neighborhood.iter().all(|&v| v >= values[i])
                && neighborhood.iter().filter(|&&v| v == values[i]).count() == 1
        };
        if is_extreme {
            points.push(i);
        }
    }
    points
}

struct Divergence {
    direction: Direction,
    magnitude: f64,
    recent_index: usize,
    stop: f64,
    target: f64,
}

pub fn generate(
    candles: &[Candle],
    snapshot: &IndicatorSnapshot,
    config: &OrderFlowConfig,
) -> Option<StrategySignal> {
    if candles.len() < config.lookback {
        return None;
    }
    let window = &candles[candles.len() - config.lookback..];

    let mut cumulative = Vec::with_capacity(window.len());
    let mut running = 0.0;
    for candle in window {
        running += signed_delta(candle);
        cumulative.push(running);
    }
    // Institutional-activity gate: thin delta means no edge here
    if running.abs() < config.institutional_threshold {
        return None;
    }

    let lows: Vec<f64> = window.iter().map(|c| c.low).collect();
    let highs: Vec<f64> = window.iter().map(|c| c.high).collect();
    let swing_lows = swing_points(&lows, config.swing_window, false);
    let swing_highs = swing_points(&highs, config.swing_window, true);

    let bullish = divergence_at(
        &swing_lows,
        |a, b| lows[b] < lows[a] && cumulative[b] > cumulative[a],
        &cumulative,
    )
    .map(|(a, b, magnitude)| Divergence {
        direction: Direction::Long,
        magnitude,
        recent_index: b,
        stop: lows[a].min(lows[b]) - config.stop_buffer_atr * snapshot.atr,
        target: highest(&swing_highs, &highs)
            .unwrap_or_else(|| highs.iter().cloned().fold(f64::MIN, f64::max)),
    });
    let bearish = divergence_at(
        &swing_highs,
        |a, b| highs[b] > highs[a] && cumulative[b] < cumulative[a],
        &cumulative,
    )
    .map(|(a, b, magnitude)| Divergence {
        direction: Direction::Short,
        magnitude,
        recent_index: b,
        stop: highs[a].max(highs[b]) + config.stop_buffer_atr * snapshot.atr,
        target: lowest(&swing_lows, &lows)
            .unwrap_or_else(|| lows.iter().cloned().fold(f64::MAX, f64::min)),
    });

    // When both sides diverge, trust the more recent structure
    let chosen = match (bullish, bearish) {
        (Some(b), Some(s)) => {
            if b.recent_index >= s.recent_index {
                b
            } else {
                s
            }
        }
        (Some(b), None) => b,
        (None, Some(s)) => s,
        (None, None) => return None,
    };

    let mut confidence = BASE_CONFIDENCE;
    if chosen.magnitude > config.institutional_threshold / 2.0 {
        confidence += MAGNITUDE_BONUS;
    }

    Some(StrategySignal {
        direction: chosen.direction,
        confidence: confidence.clamp(0.0, 100.0),
        entry: snapshot.last_close,
        stop_loss: chosen.stop,
        take_profit: chosen.target,
        strategy_name: STRATEGY_NAME,
        rationale: format!(
            "{} delta divergence, magnitude {:.0}, cumulative delta {:.0}",
            chosen.direction, chosen.magnitude, running
        ),
    })
}

fn highest(indices: &[usize], values: &[f64]) -> Option<f64> {
    indices
        .iter()
        .map(|&i| values[i])
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
}

fn lowest(indices: &[usize], values: &[f64]) -> Option<f64> {
    indices
        .iter()
        .map(|&i| values[i])
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
}

/// Compare the last two swing points; returns (older, newer, magnitude)
/// when the price/delta structures disagree.
fn divergence_at(
    swings: &[usize],
    diverges: impl Fn(usize, usize) -> bool,
    cumulative: &[f64],
) -> Option<(usize, usize, f64)> {
    if swings.len() < 2 {
        return None;
    }
    let a = swings[swings.len() - 2];
    let b = swings[swings.len() - 1];
    if diverges(a, b) {
        Some((a, b, (cumulative[b] - cumulative[a]).abs()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle(i: usize, low: f64, bullish_bar: bool, volume: f64) -> Candle {
        let (open, close) = if bullish_bar {
            (low + 0.2, low + 0.8)
        } else {
            (low + 0.8, low + 0.2)
        };
        Candle {
            time: Utc.with_ymd_and_hms(2025, 3, 10, 14, i as u32, 0).unwrap(),
            open,
            high: low + 1.0,
            low,
            close,
            volume,
        }
    }

    /// Price makes a lower low at bar 20 than bar 10, while cumulative
    /// delta turns up after bar 10.
    fn bullish_divergence_series() -> Vec<Candle> {
        (0..30)
            .map(|i| {
                let low = if i <= 10 {
                    100.0 - i as f64 * 0.5
                } else if i <= 15 {
                    95.0 + (i - 10) as f64 * 0.4
                } else if i <= 20 {
                    97.0 - (i - 15) as f64 * 0.65
                } else {
                    93.75 + (i - 20) as f64 * 0.3
                };
                candle(i, low, i > 10, 300.0)
            })
            .collect()
    }

    #[test]
    fn test_bullish_divergence_long() {
        let candles = bullish_divergence_series();
        let mut snapshot = IndicatorSnapshot::neutral(95.0);
        snapshot.atr = 2.0;
        snapshot.last_close = candles.last().unwrap().close;

        let signal = generate(&candles, &snapshot, &OrderFlowConfig::default()).unwrap();
        assert_eq!(signal.direction, Direction::Long);
        // Magnitude 3000 > 750: base 75 + 10
        assert_eq!(signal.confidence, 85.0);
        // Stop below the deeper swing low minus the buffer
        assert!(signal.stop_loss < 93.75);
        assert!(signal.take_profit > signal.entry);
    }

    #[test]
    fn test_insufficient_history() {
        let candles = bullish_divergence_series()[..20].to_vec();
        let snapshot = IndicatorSnapshot::neutral(95.0);
        assert!(generate(&candles, &snapshot, &OrderFlowConfig::default()).is_none());
    }

    #[test]
    fn test_thin_delta_gated() {
        let candles = bullish_divergence_series();
        let snapshot = IndicatorSnapshot::neutral(95.0);
        let config = OrderFlowConfig {
            institutional_threshold: 10_000.0,
            ..OrderFlowConfig::default()
        };
        assert!(generate(&candles, &snapshot, &config).is_none());
    }

    #[test]
    fn test_no_divergence_no_signal() {
        // Straight decline with matching delta: structure agrees
        let candles: Vec<Candle> = (0..30)
            .map(|i| candle(i, 100.0 - i as f64 * 0.3, false, 300.0))
            .collect();
        let snapshot = IndicatorSnapshot::neutral(92.0);
        assert!(generate(&candles, &snapshot, &OrderFlowConfig::default()).is_none());
    }

    #[test]
    fn test_swing_point_detection() {
        let values = vec![5.0, 4.0, 3.0, 2.0, 3.0, 4.0, 5.0, 6.0, 5.5, 5.2];
        let lows = swing_points(&values, 3, false);
        assert_eq!(lows, vec![3]);
        let highs = swing_points(&values, 2, true);
        assert_eq!(highs, vec![7]);
    }
}
