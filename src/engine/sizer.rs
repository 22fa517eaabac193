//! Dynamic Position Sizer
//!
//! Turns a master signal into a contract count. Starts from a configured
//! base size and applies factors in a fixed order; an ILLIQUID regime
//! short-circuits everything with a blocked reason. Every applied factor
//! is recorded as a reason string for observability.

use serde::{Deserialize, Serialize};

use crate::domain::performance::PerformanceTracker;
use crate::domain::regime::MarketRegime;
use crate::indicators::IndicatorSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizerConfig {
    pub base_contracts: f64,
    pub min_contracts: u32,
    pub max_contracts: u32,
    /// Confluence bonus table, descending thresholds; highest match only
    pub confluence_bonuses: Vec<(f64, f64)>,
    /// Win streak length at which the bonus starts
    pub win_streak_min: u32,
    /// Extra contracts per win beyond the minimum streak
    pub win_streak_step: f64,
    pub win_streak_cap: f64,
    /// Drawdown-protection table, descending percent thresholds; first
    /// (most severe) match only
    pub drawdown_multipliers: Vec<(f64, f64)>,
    /// ATR/ATR20 ratio below which size scales up
    pub low_vol_ratio: f64,
    pub low_vol_multiplier: f64,
    /// ATR/ATR20 ratio above which size scales down
    pub high_vol_ratio: f64,
    pub high_vol_multiplier: f64,
    /// Per-loss linear reduction of the consecutive-loss multiplier
    pub loss_reduction_step: f64,
    pub loss_reduction_floor: f64,
}

impl Default for SizerConfig {
    fn default() -> Self {
        Self {
            base_contracts: 2.0,
            min_contracts: 1,
            max_contracts: 5,
            confluence_bonuses: vec![(90.0, 2.0), (75.0, 1.0), (60.0, 0.5)],
            win_streak_min: 2,
            win_streak_step: 0.25,
            win_streak_cap: 1.0,
            drawdown_multipliers: vec![(75.0, 0.25), (50.0, 0.5), (25.0, 0.75)],
            low_vol_ratio: 0.8,
            low_vol_multiplier: 1.25,
            high_vol_ratio: 1.3,
            high_vol_multiplier: 0.75,
            loss_reduction_step: 0.1,
            loss_reduction_floor: 0.5,
        }
    }
}

fn regime_multiplier(regime: MarketRegime) -> f64 {
    match regime {
        MarketRegime::Illiquid => 0.0,
        MarketRegime::TrendStrongUp | MarketRegime::TrendStrongDown => 1.25,
        MarketRegime::TrendWeakUp | MarketRegime::TrendWeakDown => 1.0,
        MarketRegime::RangeTight => 0.75,
        MarketRegime::RangeWide => 1.0,
        MarketRegime::HighVolatility => 0.75,
        MarketRegime::LowVolatility => 1.0,
        MarketRegime::NewsDriven => 0.5,
    }
}

/// Sizing outcome plus the factor trail that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeDecision {
    pub contracts: u32,
    pub reasons: Vec<String>,
}

pub fn size_position(
    regime: MarketRegime,
    confluence_score: f64,
    snapshot: &IndicatorSnapshot,
    performance: &PerformanceTracker,
    config: &SizerConfig,
) -> SizeDecision {
    let mut reasons = Vec::new();

    // (1) regime: ILLIQUID blocks outright, nothing else runs
    let regime_mult = regime_multiplier(regime);
    if regime_mult == 0.0 {
        return SizeDecision {
            contracts: 0,
            reasons: vec![format!("blocked: regime {regime} is untradeable")],
        };
    }
    let mut size = config.base_contracts * regime_mult;
    reasons.push(format!("regime {regime}: x{regime_mult:.2}"));

    // (2) confluence bonus, highest matching threshold only
    if let Some((threshold, bonus)) = config
        .confluence_bonuses
        .iter()
        .find(|(threshold, _)| confluence_score >= *threshold)
    {
        size += bonus;
        reasons.push(format!("confluence >= {threshold:.0}: +{bonus:.2}"));
    }

    // (3) win-streak bonus, scaled beyond the minimum and capped
    if performance.consecutive_wins >= config.win_streak_min {
        let extra = (performance.consecutive_wins - config.win_streak_min + 1) as f64
            * config.win_streak_step;
        let bonus = extra.min(config.win_streak_cap);
        size += bonus;
        reasons.push(format!(
            "{} win streak: +{bonus:.2}",
            performance.consecutive_wins
        ));
    }

    // (4) drawdown protection, most severe matching tier only
    if let Some((threshold, mult)) = config
        .drawdown_multipliers
        .iter()
        .find(|(threshold, _)| performance.current_drawdown_percent >= *threshold)
    {
        size *= mult;
        reasons.push(format!(
            "drawdown {:.0}% >= {threshold:.0}%: x{mult:.2}",
            performance.current_drawdown_percent
        ));
    }

    // (5) volatility scaling on the ATR expansion ratio
    if snapshot.atr20 > 0.0 {
        let ratio = snapshot.atr / snapshot.atr20;
        if ratio < config.low_vol_ratio {
            size *= config.low_vol_multiplier;
            reasons.push(format!(
                "low volatility (ratio {ratio:.2}): x{:.2}",
                config.low_vol_multiplier
            ));
        } else if ratio > config.high_vol_ratio {
            size *= config.high_vol_multiplier;
            reasons.push(format!(
                "high volatility (ratio {ratio:.2}): x{:.2}",
                config.high_vol_multiplier
            ));
        }
    }

    // (6) consecutive-loss reduction, linear with a floor
    if performance.consecutive_losses > 0 {
        let mult = (1.0 - performance.consecutive_losses as f64 * config.loss_reduction_step)
            .max(config.loss_reduction_floor);
        size *= mult;
        reasons.push(format!(
            "{} loss streak: x{mult:.2}",
            performance.consecutive_losses
        ));
    }

    let contracts = (size.floor() as i64)
        .clamp(config.min_contracts as i64, config.max_contracts as i64) as u32;
    reasons.push(format!("final: {contracts} contracts"));

    SizeDecision { contracts, reasons }
}
