//! Indicator Library
//!
//! Computes a full [`IndicatorSnapshot`] from a trailing candle window.
//! Snapshots are computed fresh each cycle and never mutated, only
//! replaced. Fewer than [`MIN_CANDLES`](crate::domain::candle::MIN_CANDLES)
//! bars fails fast with [`IndicatorError::InsufficientData`]; no partial
//! snapshot is ever produced.

pub mod adx;
pub mod levels;
pub mod moving;
pub mod oscillators;
pub mod volatility;
pub mod vwap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::candle::{Candle, MIN_CANDLES};
use crate::domain::session::SessionConfig;

pub use levels::SessionLevels;

/// Default indicator periods
pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;
pub const ATR_BASELINE_PERIOD: usize = 20;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD: f64 = 2.0;
pub const ADX_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const VOLUME_BASELINE_PERIOD: usize = 20;

#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("Insufficient data: need {required} candles, got {got}")]
    InsufficientData { required: usize, got: usize },
}

/// Derived numeric features for one evaluation cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub ema9: f64,
    pub ema20: f64,
    pub ema50: f64,

    pub vwap: f64,
    pub vwap_upper: f64,
    pub vwap_lower: f64,

    pub rsi: f64,

    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,

    /// Wilder ATR over 14 bars
    pub atr: f64,
    /// Trailing 20-bar average true range, the expansion baseline
    pub atr20: f64,

    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    /// Band width as percent of the middle band
    pub bb_width_pct: f64,

    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,

    /// Last bar volume relative to its trailing average
    pub relative_volume: f64,

    pub levels: SessionLevels,

    pub last_close: f64,
    pub last_volume: f64,
}

impl IndicatorSnapshot {
    /// Compute a snapshot from a candle window (minimum 50 bars).
    pub fn compute(
        candles: &[Candle],
        session: &SessionConfig,
    ) -> Result<IndicatorSnapshot, IndicatorError> {
        if candles.len() < MIN_CANDLES {
            return Err(IndicatorError::InsufficientData {
                required: MIN_CANDLES,
                got: candles.len(),
            });
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
        let last = &candles[candles.len() - 1];

        let (macd, macd_signal, macd_histogram) =
            oscillators::macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
        let (bb_upper, bb_middle, bb_lower, bb_width_pct) =
            volatility::bollinger(&closes, BOLLINGER_PERIOD, BOLLINGER_STD);
        let (adx, plus_di, minus_di) = adx::adx(candles, ADX_PERIOD);
        let (vwap, vwap_upper, vwap_lower) =
            vwap::vwap_with_bands(candles, session_open_utc(last.time, session));

        let avg_volume = moving::sma(&volumes, VOLUME_BASELINE_PERIOD);
        let relative_volume = if avg_volume > 0.0 {
            last.volume / avg_volume
        } else {
            0.0
        };

        Ok(IndicatorSnapshot {
            ema9: moving::ema(&closes, 9),
            ema20: moving::ema(&closes, 20),
            ema50: moving::ema(&closes, 50),
            vwap,
            vwap_upper,
            vwap_lower,
            rsi: oscillators::rsi(&closes, RSI_PERIOD),
            macd,
            macd_signal,
            macd_histogram,
            atr: volatility::atr(candles, ATR_PERIOD),
            atr20: volatility::average_true_range_baseline(candles, ATR_BASELINE_PERIOD),
            bb_upper,
            bb_middle,
            bb_lower,
            bb_width_pct,
            adx,
            plus_di,
            minus_di,
            relative_volume,
            levels: levels::session_levels(candles, session),
            last_close: last.close,
            last_volume: last.volume,
        })
    }

    /// A featureless snapshot centered on `price`: neutral RSI, unit
    /// relative volume, zero trend. Useful as a test baseline.
    pub fn neutral(price: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema9: price,
            ema20: price,
            ema50: price,
            vwap: price,
            vwap_upper: price,
            vwap_lower: price,
            rsi: 50.0,
            macd: 0.0,
            macd_signal: 0.0,
            macd_histogram: 0.0,
            atr: 1.0,
            atr20: 1.0,
            bb_upper: price,
            bb_middle: price,
            bb_lower: price,
            bb_width_pct: 1.5,
            adx: 15.0,
            plus_di: 20.0,
            minus_di: 20.0,
            relative_volume: 1.0,
            levels: SessionLevels::default(),
            last_close: price,
            last_volume: 1000.0,
        }
    }
}

/// UTC timestamp of today's session open relative to the given bar time,
/// or None if the bar precedes the open (VWAP then spans the full window).
fn session_open_utc(time: DateTime<Utc>, session: &SessionConfig) -> Option<DateTime<Utc>> {
    let offset = chrono::FixedOffset::east_opt(session.utc_offset_hours * 3600)?;
    let local = time.with_timezone(&offset);
    let open_local = local
        .date_naive()
        .and_time(session.session_open)
        .and_local_timezone(offset)
        .single()?;
    let open_utc = open_local.with_timezone(&Utc);
    if time >= open_utc {
        Some(open_utc)
    } else {
        None
    }
}
