//! Adaptive Threshold Calculator
//!
//! Computes the confluence/confidence/risk-reward bar a master signal
//! must clear. Starts from fixed base values and applies additive
//! adjustments in a fixed order (regime, session, time-of-day, recent
//! performance), then clamps. Pure given its inputs; every applied
//! adjustment is recorded as a reason string.

use serde::{Deserialize, Serialize};

use crate::domain::performance::PerformanceTracker;
use crate::domain::regime::MarketRegime;
use crate::domain::session::{TimeOfDay, TradingSession};

pub const CONFLUENCE_CLAMP: (f64, f64) = (30.0, 95.0);
pub const CONFIDENCE_CLAMP: (f64, f64) = (50.0, 95.0);
pub const RISK_REWARD_CLAMP: (f64, f64) = (1.0, 5.0);

/// Base values the adjustments start from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub base_confluence: f64,
    pub base_confidence: f64,
    pub base_risk_reward: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            base_confluence: 60.0,
            base_confidence: 70.0,
            base_risk_reward: 2.0,
        }
    }
}

/// The bar a decision must clear this cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredThresholds {
    pub confluence: f64,
    pub confidence: f64,
    pub risk_reward: f64,
    pub reasons: Vec<String>,
}

/// One additive adjustment: (confluence, confidence, risk-reward)
type Adjustment = (f64, f64, f64);

fn regime_adjustment(regime: MarketRegime) -> Adjustment {
    match regime {
        // Aggressive in strong trends, selective in chop
        MarketRegime::TrendStrongUp | MarketRegime::TrendStrongDown => (-20.0, -10.0, -0.5),
        MarketRegime::TrendWeakUp | MarketRegime::TrendWeakDown => (-10.0, -5.0, -0.25),
        MarketRegime::RangeTight => (15.0, 10.0, 0.5),
        MarketRegime::RangeWide => (5.0, 5.0, 0.25),
        MarketRegime::HighVolatility => (10.0, 10.0, 0.5),
        MarketRegime::LowVolatility => (5.0, 0.0, 0.0),
        MarketRegime::NewsDriven => (25.0, 20.0, 1.0),
        // Effectively untradeable
        MarketRegime::Illiquid => (50.0, 50.0, 2.0),
    }
}

fn session_adjustment(session: TradingSession) -> Adjustment {
    match session {
        TradingSession::Regular => (0.0, 0.0, 0.0),
        TradingSession::European => (10.0, 5.0, 0.25),
        TradingSession::Overnight => (20.0, 10.0, 0.5),
    }
}

fn time_of_day_adjustment(time_of_day: TimeOfDay) -> Adjustment {
    match time_of_day {
        TimeOfDay::OpeningHour => (5.0, 5.0, 0.0),
        TimeOfDay::Morning => (0.0, 0.0, 0.0),
        TimeOfDay::Midday => (10.0, 5.0, 0.25),
        TimeOfDay::Afternoon => (5.0, 0.0, 0.0),
        TimeOfDay::PowerHour => (0.0, 5.0, 0.0),
        TimeOfDay::Closed => (20.0, 10.0, 0.5),
    }
}

/// Only the single most specific matching streak rule applies; larger
/// loss streaks dominate smaller ones, and any loss streak dominates a
/// win streak.
fn performance_adjustment(performance: &PerformanceTracker) -> (Adjustment, Option<String>) {
    let losses = performance.consecutive_losses;
    let wins = performance.consecutive_wins;
    if losses >= 4 {
        ((20.0, 15.0, 0.5), Some(format!("{losses} consecutive losses")))
    } else if losses >= 3 {
        ((15.0, 10.0, 0.5), Some("3 consecutive losses".to_string()))
    } else if losses >= 2 {
        ((10.0, 5.0, 0.25), Some("2 consecutive losses".to_string()))
    } else if wins >= 4 {
        ((-10.0, -5.0, -0.25), Some(format!("{wins} consecutive wins")))
    } else if wins >= 2 {
        ((-5.0, -2.0, 0.0), Some("2 consecutive wins".to_string()))
    } else {
        ((0.0, 0.0, 0.0), None)
    }
}

pub fn compute(
    regime: MarketRegime,
    session: TradingSession,
    time_of_day: TimeOfDay,
    performance: &PerformanceTracker,
    config: &ThresholdConfig,
) -> RequiredThresholds {
    let mut confluence = config.base_confluence;
    let mut confidence = config.base_confidence;
    let mut risk_reward = config.base_risk_reward;
    let mut reasons = Vec::new();

    fn apply(
        adj: Adjustment,
        label: String,
        confluence: &mut f64,
        confidence: &mut f64,
        risk_reward: &mut f64,
        reasons: &mut Vec<String>,
    ) {
        if adj == (0.0, 0.0, 0.0) {
            return;
        }
        *confluence += adj.0;
        *confidence += adj.1;
        *risk_reward += adj.2;
        reasons.push(format!(
            "{label}: {:+.0} confluence, {:+.0} confidence, {:+.2} risk-reward",
            adj.0, adj.1, adj.2
        ));
    }

    apply(
        regime_adjustment(regime),
        format!("regime {regime}"),
        &mut confluence,
        &mut confidence,
        &mut risk_reward,
        &mut reasons,
    );
    apply(
        session_adjustment(session),
        format!("session {session:?}"),
        &mut confluence,
        &mut confidence,
        &mut risk_reward,
        &mut reasons,
    );
    apply(
        time_of_day_adjustment(time_of_day),
        format!("time of day {time_of_day:?}"),
        &mut confluence,
        &mut confidence,
        &mut risk_reward,
        &mut reasons,
    );
    let (perf_adj, perf_label) = performance_adjustment(performance);
    if let Some(label) = perf_label {
        apply(
            perf_adj,
            label,
            &mut confluence,
            &mut confidence,
            &mut risk_reward,
            &mut reasons,
        );
    }

    RequiredThresholds {
        confluence: confluence.clamp(CONFLUENCE_CLAMP.0, CONFLUENCE_CLAMP.1),
        confidence: confidence.clamp(CONFIDENCE_CLAMP.0, CONFIDENCE_CLAMP.1),
        risk_reward: risk_reward.clamp(RISK_REWARD_CLAMP.0, RISK_REWARD_CLAMP.1),
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neutral_performance() -> PerformanceTracker {
        PerformanceTracker::new(1000.0)
    }

    fn compute_for(regime: MarketRegime) -> RequiredThresholds {
        compute(
            regime,
            TradingSession::Regular,
            TimeOfDay::Morning,
            &neutral_performance(),
            &ThresholdConfig::default(),
        )
    }

    #[test]
    fn test_strong_trend_lowers_bar() {
        let required = compute_for(MarketRegime::TrendStrongUp);
        assert_eq!(required.confluence, 40.0);
        assert_eq!(required.confidence, 60.0);
        assert_eq!(required.risk_reward, 1.5);
    }

    #[test]
    fn test_tight_range_raises_bar() {
        let required = compute_for(MarketRegime::RangeTight);
        assert_eq!(required.confluence, 75.0);
    }

    #[test]
    fn test_illiquid_effectively_untradeable() {
        let required = compute_for(MarketRegime::Illiquid);
        // Clamped at the top of each range
        assert_eq!(required.confluence, 95.0);
        assert_eq!(required.confidence, 95.0);
        assert_eq!(required.risk_reward, 4.0);
    }

    #[test]
    fn test_clamps_hold_under_stacked_adjustments() {
        let mut performance = neutral_performance();
        performance.consecutive_losses = 5;
        let required = compute(
            MarketRegime::NewsDriven,
            TradingSession::Overnight,
            TimeOfDay::Closed,
            &performance,
            &ThresholdConfig::default(),
        );
        assert_eq!(required.confluence, 95.0);
        assert_eq!(required.confidence, 95.0);
        assert_eq!(required.risk_reward, 4.5);
    }

    #[test]
    fn test_win_streak_lowers_bar() {
        let mut performance = neutral_performance();
        performance.consecutive_wins = 3;
        let required = compute(
            MarketRegime::RangeWide,
            TradingSession::Regular,
            TimeOfDay::Morning,
            &performance,
            &ThresholdConfig::default(),
        );
        // 60 + 5 regime - 5 streak
        assert_eq!(required.confluence, 60.0);
    }

    #[test]
    fn test_only_most_specific_streak_rule() {
        let mut performance = neutral_performance();
        performance.consecutive_losses = 4;
        let required = compute(
            MarketRegime::RangeWide,
            TradingSession::Regular,
            TimeOfDay::Morning,
            &performance,
            &ThresholdConfig::default(),
        );
        // 60 + 5 regime + 20 (the >=4 rule alone, not 20+15+10)
        assert_eq!(required.confluence, 85.0);
    }

    #[test]
    fn test_reasons_document_adjustments() {
        let required = compute_for(MarketRegime::TrendStrongUp);
        assert_eq!(required.reasons.len(), 1);
        assert!(required.reasons[0].contains("TREND_STRONG_UP"));
    }
}
