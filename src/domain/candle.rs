//! Candle Series
//!
//! OHLCV bars and boundary validation. Raw candle payloads (JSON from the
//! data feed) are converted here into typed, validated series before the
//! engine ever sees them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum bars required for a full indicator snapshot
pub const MIN_CANDLES: usize = 50;

#[derive(Debug, Error)]
pub enum CandleError {
    #[error("Candle at {0} is out of order (previous candle at {1})")]
    OutOfOrder(DateTime<Utc>, DateTime<Utc>),

    #[error("Duplicate candle timestamp {0}")]
    DuplicateTimestamp(DateTime<Utc>),

    #[error("Candle at {time} has invalid range: high {high} < low {low}")]
    InvalidRange {
        time: DateTime<Utc>,
        high: f64,
        low: f64,
    },

    #[error("Candle at {0} has negative volume {1}")]
    NegativeVolume(DateTime<Utc>, f64),
}

/// A single OHLCV bar. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, CandleError> {
        if high < low {
            return Err(CandleError::InvalidRange { time, high, low });
        }
        if volume < 0.0 {
            return Err(CandleError::NegativeVolume(time, volume));
        }
        Ok(Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Typical price (H+L+C)/3, used for VWAP
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Full bar range in points
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Absolute body size in points
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// Validate that a slice of candles forms a legal series:
/// time-ordered with no duplicate timestamps.
pub fn validate_series(candles: &[Candle]) -> Result<(), CandleError> {
    for pair in candles.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.time == prev.time {
            return Err(CandleError::DuplicateTimestamp(next.time));
        }
        if next.time < prev.time {
            return Err(CandleError::OutOfOrder(next.time, prev.time));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle_at(minute: u32) -> Candle {
        let time = Utc.with_ymd_and_hms(2025, 3, 10, 14, minute, 0).unwrap();
        Candle::new(time, 100.0, 101.0, 99.0, 100.5, 1500.0).unwrap()
    }

    #[test]
    fn test_candle_rejects_inverted_range() {
        let time = Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap();
        let result = Candle::new(time, 100.0, 98.0, 102.0, 100.0, 10.0);
        assert!(matches!(result, Err(CandleError::InvalidRange { .. })));
    }

    #[test]
    fn test_candle_rejects_negative_volume() {
        let time = Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap();
        let result = Candle::new(time, 100.0, 101.0, 99.0, 100.0, -5.0);
        assert!(matches!(result, Err(CandleError::NegativeVolume(_, _))));
    }

    #[test]
    fn test_typical_price() {
        let candle = candle_at(0);
        assert_eq!(candle.typical_price(), (101.0 + 99.0 + 100.5) / 3.0);
    }

    #[test]
    fn test_validate_series_ordered() {
        let series = vec![candle_at(0), candle_at(1), candle_at(2)];
        assert!(validate_series(&series).is_ok());
    }

    #[test]
    fn test_validate_series_duplicate() {
        let series = vec![candle_at(0), candle_at(0)];
        assert!(matches!(
            validate_series(&series),
            Err(CandleError::DuplicateTimestamp(_))
        ));
    }

    #[test]
    fn test_validate_series_out_of_order() {
        let series = vec![candle_at(5), candle_at(3)];
        assert!(matches!(
            validate_series(&series),
            Err(CandleError::OutOfOrder(_, _))
        ));
    }
}
