//! Volume-Weighted Average Price
//!
//! VWAP over the full window or from a session-start cutoff, using typical
//! price (H+L+C)/3 weighted by volume, plus the volume-weighted population
//! standard deviation for the bands.

use chrono::{DateTime, Utc};

use crate::domain::candle::Candle;

/// VWAP and its one-sigma band: (vwap, upper, lower).
/// With zero total volume, falls back to the unweighted mean of typical
/// prices with a zero-width band.
pub fn vwap_with_bands(candles: &[Candle], session_start: Option<DateTime<Utc>>) -> (f64, f64, f64) {
    let window: Vec<&Candle> = match session_start {
        Some(cutoff) => candles.iter().filter(|c| c.time >= cutoff).collect(),
        None => candles.iter().collect(),
    };
    // An empty session window (e.g. first bar of the day) falls back to the
    // full history so the mean-reversion anchor is never undefined.
    let window: Vec<&Candle> = if window.is_empty() {
        candles.iter().collect()
    } else {
        window
    };
    if window.is_empty() {
        return (0.0, 0.0, 0.0);
    }

    let total_volume: f64 = window.iter().map(|c| c.volume).sum();
    let vwap = if total_volume > 0.0 {
        window
            .iter()
            .map(|c| c.typical_price() * c.volume)
            .sum::<f64>()
            / total_volume
    } else {
        window.iter().map(|c| c.typical_price()).sum::<f64>() / window.len() as f64
    };

    let std_dev = if total_volume > 0.0 {
        let variance = window
            .iter()
            .map(|c| c.volume * (c.typical_price() - vwap).powi(2))
            .sum::<f64>()
            / total_volume;
        variance.sqrt()
    } else {
        0.0
    };

    (vwap, vwap + std_dev, vwap - std_dev)
}
