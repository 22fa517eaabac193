//! Volatility Measures
//!
//! Wilder ATR and Bollinger Bands. A zero standard deviation collapses the
//! bands onto the middle (width 0) rather than producing NaN.

use crate::domain::candle::Candle;

use super::moving::sma;

/// True-range series; the first bar uses high-low only (no previous close).
pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            if i == 0 {
                candle.high - candle.low
            } else {
                let prev_close = candles[i - 1].close;
                let hl = candle.high - candle.low;
                let hc = (candle.high - prev_close).abs();
                let lc = (candle.low - prev_close).abs();
                hl.max(hc).max(lc)
            }
        })
        .collect()
}

/// Wilder-smoothed ATR: seed with the mean of the first `period` true
/// ranges, then atr = (prev * (n-1) + tr) / n.
pub fn atr(candles: &[Candle], period: usize) -> f64 {
    if period == 0 || candles.is_empty() {
        return 0.0;
    }
    let trs = true_ranges(candles);
    if trs.len() <= period {
        return trs.iter().sum::<f64>() / trs.len() as f64;
    }
    let mut value = trs[..period].iter().sum::<f64>() / period as f64;
    for tr in &trs[period..] {
        value = (value * (period as f64 - 1.0) + tr) / period as f64;
    }
    value
}

/// Baseline ATR for expansion/compression ratios: the simple average of
/// the trailing `period` true ranges.
pub fn average_true_range_baseline(candles: &[Candle], period: usize) -> f64 {
    let trs = true_ranges(candles);
    sma(&trs, period)
}

/// Bollinger Bands over closes: (upper, middle, lower, width percent of middle)
pub fn bollinger(closes: &[f64], period: usize, num_std: f64) -> (f64, f64, f64, f64) {
    if closes.is_empty() || period == 0 {
        return (0.0, 0.0, 0.0, 0.0);
    }
    let window = &closes[closes.len().saturating_sub(period)..];
    let middle = window.iter().sum::<f64>() / window.len() as f64;
    let variance =
        window.iter().map(|c| (c - middle).powi(2)).sum::<f64>() / window.len() as f64;
    let std_dev = variance.sqrt();

    let upper = middle + num_std * std_dev;
    let lower = middle - num_std * std_dev;
    let width_pct = if middle.abs() > f64::EPSILON {
        (upper - lower) / middle * 100.0
    } else {
        0.0
    };
    (upper, middle, lower, width_pct)
}
