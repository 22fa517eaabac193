//! Market Regime Classification
//!
//! Maps an indicator snapshot to exactly one regime label per cycle.
//! Evaluation order matters: illiquidity first (untradeable markets trump
//! every other label), then news spikes, then volatility, then trend, then
//! range. Volatility takes priority over trend because extreme volatility
//! invalidates trend-following assumptions regardless of directional bias.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::indicators::IndicatorSnapshot;

/// ATR expansion ratio above which the market is high-volatility
pub const HIGH_VOL_ATR_RATIO: f64 = 1.5;
/// ATR compression ratio below which the market is low-volatility
pub const LOW_VOL_ATR_RATIO: f64 = 0.7;
/// Bollinger width percent above which the market is high-volatility
pub const HIGH_VOL_BB_WIDTH_PCT: f64 = 3.0;
/// Bollinger width percent below which the market is low-volatility
pub const LOW_VOL_BB_WIDTH_PCT: f64 = 0.5;
/// ADX above which a trend is considered present
pub const TREND_ADX_THRESHOLD: f64 = 25.0;
/// ADX above which a trend is considered strong
pub const STRONG_TREND_ADX_THRESHOLD: f64 = 40.0;
/// Relative volume below which the market is treated as illiquid
pub const ILLIQUID_REL_VOLUME: f64 = 0.3;
/// ATR ratio + relative volume combo that flags a news-driven spike
pub const NEWS_ATR_RATIO: f64 = 2.0;
pub const NEWS_REL_VOLUME: f64 = 2.0;
/// Bollinger width percent splitting tight vs wide ranges
pub const TIGHT_RANGE_BB_WIDTH_PCT: f64 = 1.0;

/// Classified market state, one value per evaluation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketRegime {
    TrendStrongUp,
    TrendWeakUp,
    TrendStrongDown,
    TrendWeakDown,
    RangeTight,
    RangeWide,
    HighVolatility,
    LowVolatility,
    NewsDriven,
    Illiquid,
}

impl MarketRegime {
    /// Classify a snapshot. First match wins.
    pub fn classify(snapshot: &IndicatorSnapshot) -> MarketRegime {
        let atr_ratio = if snapshot.atr20 > 0.0 {
            snapshot.atr / snapshot.atr20
        } else {
            1.0
        };

        if snapshot.relative_volume < ILLIQUID_REL_VOLUME {
            return MarketRegime::Illiquid;
        }

        if atr_ratio > NEWS_ATR_RATIO && snapshot.relative_volume > NEWS_REL_VOLUME {
            return MarketRegime::NewsDriven;
        }

        if atr_ratio > HIGH_VOL_ATR_RATIO || snapshot.bb_width_pct > HIGH_VOL_BB_WIDTH_PCT {
            return MarketRegime::HighVolatility;
        }
        if atr_ratio < LOW_VOL_ATR_RATIO || snapshot.bb_width_pct < LOW_VOL_BB_WIDTH_PCT {
            return MarketRegime::LowVolatility;
        }

        if snapshot.adx > TREND_ADX_THRESHOLD {
            let up = snapshot.plus_di - snapshot.minus_di > 0.0;
            let strong = snapshot.adx > STRONG_TREND_ADX_THRESHOLD;
            return match (up, strong) {
                (true, true) => MarketRegime::TrendStrongUp,
                (true, false) => MarketRegime::TrendWeakUp,
                (false, true) => MarketRegime::TrendStrongDown,
                (false, false) => MarketRegime::TrendWeakDown,
            };
        }

        if snapshot.bb_width_pct < TIGHT_RANGE_BB_WIDTH_PCT {
            MarketRegime::RangeTight
        } else {
            MarketRegime::RangeWide
        }
    }

    /// True for either strong-trend label
    pub fn is_strong_trend(&self) -> bool {
        matches!(self, MarketRegime::TrendStrongUp | MarketRegime::TrendStrongDown)
    }

    /// True for any trending label
    pub fn is_trending(&self) -> bool {
        matches!(
            self,
            MarketRegime::TrendStrongUp
                | MarketRegime::TrendWeakUp
                | MarketRegime::TrendStrongDown
                | MarketRegime::TrendWeakDown
        )
    }

    pub fn is_tradeable(&self) -> bool {
        !matches!(self, MarketRegime::Illiquid)
    }
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MarketRegime::TrendStrongUp => "TREND_STRONG_UP",
            MarketRegime::TrendWeakUp => "TREND_WEAK_UP",
            MarketRegime::TrendStrongDown => "TREND_STRONG_DOWN",
            MarketRegime::TrendWeakDown => "TREND_WEAK_DOWN",
            MarketRegime::RangeTight => "RANGE_TIGHT",
            MarketRegime::RangeWide => "RANGE_WIDE",
            MarketRegime::HighVolatility => "HIGH_VOLATILITY",
            MarketRegime::LowVolatility => "LOW_VOLATILITY",
            MarketRegime::NewsDriven => "NEWS_DRIVEN",
            MarketRegime::Illiquid => "ILLIQUID",
        };
        write!(f, "{}", label)
    }
}
