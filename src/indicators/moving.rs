//! Moving Averages
//!
//! SMA and EMA over close prices. EMA uses k = 2/(n+1), seeded with the
//! SMA of the first n values; warmup shorter than the period returns the
//! plain mean of what is available.

/// Simple moving average of the trailing `period` values.
/// Falls back to the mean of all values when fewer are available.
pub fn sma(values: &[f64], period: usize) -> f64 {
    if values.is_empty() || period == 0 {
        return 0.0;
    }
    let window = &values[values.len().saturating_sub(period)..];
    window.iter().sum::<f64>() / window.len() as f64
}

/// Latest EMA value over the whole input series.
pub fn ema(values: &[f64], period: usize) -> f64 {
    ema_series(values, period).last().copied().unwrap_or(0.0)
}

/// Full EMA series (needed for the MACD signal line).
/// Entries before the seed point carry the running mean.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() || period == 0 {
        return Vec::new();
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    let mut prev = 0.0;

    for (i, &value) in values.iter().enumerate() {
        if i < period {
            sum += value;
            prev = sum / (i + 1) as f64;
        } else {
            prev = value * k + prev * (1.0 - k);
        }
        out.push(prev);
    }
    out
}
