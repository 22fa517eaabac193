//! Oscillators
//!
//! RSI with Wilder smoothing and MACD (12/26/9).
//! Division guards: avg_loss == 0 pins RSI at 100.

use super::moving::ema_series;

/// Wilder-smoothed RSI over close prices. Returns 50 (neutral) until at
/// least `period + 1` closes are available.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return 50.0;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    // Initial averages over the first `period` changes
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss += -change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    // Wilder smoothing for the remainder
    for i in (period + 1)..closes.len() {
        let change = closes[i] - closes[i - 1];
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// MACD line, signal line, and histogram for the latest bar
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> (f64, f64, f64) {
    if closes.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let fast_series = ema_series(closes, fast);
    let slow_series = ema_series(closes, slow);
    let macd_series: Vec<f64> = fast_series
        .iter()
        .zip(slow_series.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_series = ema_series(&macd_series, signal);

    let macd_value = *macd_series.last().unwrap_or(&0.0);
    let signal_value = *signal_series.last().unwrap_or(&0.0);
    (macd_value, signal_value, macd_value - signal_value)
}
