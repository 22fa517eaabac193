//! Session Price Levels
//!
//! Opening-range and previous-day levels derived by filtering the candle
//! window to fixed wall-clock windows in the exchange's trading calendar.

use chrono::{Datelike, NaiveDate};

use crate::domain::candle::Candle;
use crate::domain::session::SessionConfig;

/// Key session-derived reference prices
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionLevels {
    pub opening_range_high: Option<f64>,
    pub opening_range_low: Option<f64>,
    pub prev_day_high: Option<f64>,
    pub prev_day_low: Option<f64>,
    pub prev_day_close: Option<f64>,
}

/// Extract session levels from the window, anchored to the exchange-local
/// calendar day of the last candle.
pub fn session_levels(candles: &[Candle], session: &SessionConfig) -> SessionLevels {
    let Some(last) = candles.last() else {
        return SessionLevels::default();
    };
    let today = local_date(last, session);

    let mut levels = SessionLevels::default();

    // Opening range: bars inside the formation window of today's session
    let or_end = session.opening_range_end();
    for candle in candles {
        if local_date(candle, session) != today {
            continue;
        }
        let local = session.local_time(candle.time);
        if local >= session.session_open && local < or_end {
            levels.opening_range_high = Some(
                levels
                    .opening_range_high
                    .map_or(candle.high, |h: f64| h.max(candle.high)),
            );
            levels.opening_range_low = Some(
                levels
                    .opening_range_low
                    .map_or(candle.low, |l: f64| l.min(candle.low)),
            );
        }
    }

    // Previous day: the most recent earlier calendar day present in the window
    let prev_day: Option<NaiveDate> = candles
        .iter()
        .map(|c| local_date(c, session))
        .filter(|d| *d < today)
        .max();
    if let Some(prev) = prev_day {
        let mut prev_close: Option<&Candle> = None;
        for candle in candles.iter().filter(|c| local_date(c, session) == prev) {
            levels.prev_day_high =
                Some(levels.prev_day_high.map_or(candle.high, |h: f64| h.max(candle.high)));
            levels.prev_day_low =
                Some(levels.prev_day_low.map_or(candle.low, |l: f64| l.min(candle.low)));
            prev_close = Some(candle);
        }
        levels.prev_day_close = prev_close.map(|c| c.close);
    }

    levels
}

fn local_date(candle: &Candle, session: &SessionConfig) -> NaiveDate {
    let offset = chrono::FixedOffset::east_opt(session.utc_offset_hours * 3600)
        .unwrap_or_else(|| chrono::FixedOffset::east_opt(0).unwrap());
    let local = candle.time.with_timezone(&offset);
    NaiveDate::from_ymd_opt(local.year(), local.month(), local.day())
        .unwrap_or_else(|| local.date_naive())
}
