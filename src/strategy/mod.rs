//! Strategy Layer
//!
//! Four independent signal generators plus the confluence aggregator that
//! merges their output into one master signal:
//! - `mean_reversion`: fades stretches from VWAP with RSI confirmation
//! - `breakout`: trades closes beyond the opening range
//! - `trend_pullback`: joins EMA trends on RSI retracements
//! - `order_flow`: price/delta swing divergence
//!
//! Every generator is a pure function of (candles, snapshot, config);
//! none holds state between cycles.

pub mod breakout;
pub mod confluence;
pub mod mean_reversion;
pub mod order_flow;
pub mod params;
pub mod trend_pullback;

pub use confluence::aggregate;
pub use params::{
    BreakoutConfig, MeanReversionConfig, OrderFlowConfig, StrategyConfigError, StrategyParams,
    StrategySuiteConfig, StrategyWeights, TrendPullbackConfig,
};

use crate::domain::candle::Candle;
use crate::domain::session::SessionConfig;
use crate::domain::signal::StrategySignal;
use crate::indicators::IndicatorSnapshot;

/// Run every enabled strategy over the same inputs and collect the
/// candidates that fired.
pub fn generate_all(
    candles: &[Candle],
    snapshot: &IndicatorSnapshot,
    config: &StrategySuiteConfig,
    session: &SessionConfig,
) -> Vec<StrategySignal> {
    let mut signals = Vec::with_capacity(confluence::STRATEGY_COUNT);
    for params in config.active_params() {
        let candidate = match &params {
            StrategyParams::MeanReversion(c) => mean_reversion::generate(snapshot, c),
            StrategyParams::Breakout(c) => breakout::generate(candles, snapshot, c, session),
            StrategyParams::TrendPullback(c) => trend_pullback::generate(snapshot, c),
            StrategyParams::OrderFlow(c) => order_flow::generate(candles, snapshot, c),
        };
        if let Some(signal) = candidate {
            signals.push(signal);
        }
    }
    for signal in &signals {
        tracing::debug!(
            strategy = signal.strategy_name,
            direction = %signal.direction,
            confidence = signal.confidence,
            strength = ?signal.strength(),
            "strategy signal"
        );
    }
    signals
}
