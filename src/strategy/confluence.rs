//! Confluence Aggregator
//!
//! Merges the candidate signals into one master signal. Direction is a
//! majority vote by count, tie-broken by summed confidence. The merged
//! stop is the tightest among agreeing signals and the merged target the
//! furthest, so agreement tightens risk while letting winners run.

use crate::domain::signal::{Direction, MasterSignal, SignalStrength, StrategySignal};

use super::params::StrategyWeights;

/// Number of strategies in the suite; the confluence denominator
pub const STRATEGY_COUNT: usize = 4;

const MULTI_AGREEMENT_BONUS: f64 = 20.0;
const HIGH_CONFLUENCE: f64 = 75.0;
const MODERATE_CONFLUENCE: f64 = 50.0;

pub fn aggregate(signals: &[StrategySignal], weights: &StrategyWeights) -> MasterSignal {
    let longs: Vec<&StrategySignal> = signals
        .iter()
        .filter(|s| s.direction == Direction::Long)
        .collect();
    let shorts: Vec<&StrategySignal> = signals
        .iter()
        .filter(|s| s.direction == Direction::Short)
        .collect();

    let direction = match longs.len().cmp(&shorts.len()) {
        std::cmp::Ordering::Greater => Direction::Long,
        std::cmp::Ordering::Less => Direction::Short,
        std::cmp::Ordering::Equal => {
            let long_conf: f64 = longs.iter().map(|s| s.confidence).sum();
            let short_conf: f64 = shorts.iter().map(|s| s.confidence).sum();
            if long_conf > short_conf {
                Direction::Long
            } else if short_conf > long_conf {
                Direction::Short
            } else {
                Direction::Flat
            }
        }
    };
    let agreeing = match direction {
        Direction::Long => longs,
        Direction::Short => shorts,
        Direction::Flat => return MasterSignal::flat(),
    };
    if agreeing.is_empty() {
        return MasterSignal::flat();
    }

    let count = agreeing.len();
    let mut confluence_score = count as f64 / STRATEGY_COUNT as f64 * 100.0;
    if count > 1 {
        confluence_score += MULTI_AGREEMENT_BONUS;
    }
    confluence_score = confluence_score.min(100.0);

    // Entry follows the most confident contributor
    let lead = agreeing
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .copied();
    let Some(lead) = lead else {
        return MasterSignal::flat();
    };

    // Tightest stop, furthest target
    let stop_loss = agreeing
        .iter()
        .map(|s| s.stop_loss)
        .fold(agreeing[0].stop_loss, |acc, s| match direction {
            Direction::Long => acc.max(s),
            _ => acc.min(s),
        });
    let take_profit = agreeing
        .iter()
        .map(|s| s.take_profit)
        .fold(agreeing[0].take_profit, |acc, t| match direction {
            Direction::Long => acc.max(t),
            _ => acc.min(t),
        });

    let weight_sum: f64 = agreeing
        .iter()
        .map(|s| weights.for_strategy(s.strategy_name))
        .sum();
    let confidence = if weight_sum > 0.0 {
        agreeing
            .iter()
            .map(|s| s.confidence * weights.for_strategy(s.strategy_name))
            .sum::<f64>()
            / weight_sum
    } else {
        0.0
    };

    let position_size_multiplier = if confluence_score >= HIGH_CONFLUENCE {
        1.5
    } else if confluence_score >= MODERATE_CONFLUENCE {
        1.0
    } else {
        0.5
    };

    let confidence = confidence.clamp(0.0, 100.0);
    MasterSignal {
        direction,
        confidence,
        strength: SignalStrength::from_confidence(confidence),
        confluence_score,
        entry: lead.entry,
        stop_loss,
        take_profit,
        position_size_multiplier,
        contributors: agreeing.iter().map(|s| s.strategy_name).collect(),
    }
}
