//! Strategy Parameters
//!
//! Configuration structs for the four signal generators, one closed
//! variant per strategy. Every field has a stated default; configs are
//! assembled once at startup and validated eagerly, never merged ad hoc
//! per call.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Configuration validation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum StrategyConfigError {
    #[error("Invalid RSI band: {low} .. {high} (must be 0 <= low < high <= 100)")]
    InvalidRsiBand { low: f64, high: f64 },
    #[error("Invalid ATR multiple: {0} (must be positive)")]
    InvalidAtrMultiple(f64),
    #[error("Invalid minimum risk:reward: {0} (must be >= 1)")]
    InvalidRiskReward(f64),
    #[error("Invalid lookback: {0} (minimum 10 bars)")]
    InvalidLookback(usize),
    #[error("Invalid strategy weight: {0} (must be positive)")]
    InvalidWeight(f64),
    #[error("Breakout window ends before it starts")]
    InvalidBreakoutWindow,
}

/// VWAP mean-reversion parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanReversionConfig {
    /// Entry trigger distance from VWAP, in ATRs
    pub atr_distance: f64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// RSI levels that earn the extreme bonus
    pub rsi_extreme_low: f64,
    pub rsi_extreme_high: f64,
    /// Below this reward:risk the confidence is penalized
    pub min_risk_reward: f64,
    /// Stop distance beyond entry, in ATRs
    pub stop_atr_multiple: f64,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            atr_distance: 1.0,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_extreme_low: 25.0,
            rsi_extreme_high: 75.0,
            min_risk_reward: 1.5,
            stop_atr_multiple: 1.0,
        }
    }
}

impl MeanReversionConfig {
    pub fn validate(&self) -> Result<(), StrategyConfigError> {
        if self.rsi_oversold >= self.rsi_overbought
            || self.rsi_oversold < 0.0
            || self.rsi_overbought > 100.0
        {
            return Err(StrategyConfigError::InvalidRsiBand {
                low: self.rsi_oversold,
                high: self.rsi_overbought,
            });
        }
        if self.atr_distance <= 0.0 {
            return Err(StrategyConfigError::InvalidAtrMultiple(self.atr_distance));
        }
        if self.stop_atr_multiple <= 0.0 {
            return Err(StrategyConfigError::InvalidAtrMultiple(self.stop_atr_multiple));
        }
        if self.min_risk_reward < 1.0 {
            return Err(StrategyConfigError::InvalidRiskReward(self.min_risk_reward));
        }
        Ok(())
    }
}

/// Opening-range breakout parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakoutConfig {
    /// Earliest exchange-local time the strategy may fire
    pub eligible_from: NaiveTime,
    /// Latest exchange-local time the strategy may fire
    pub eligible_until: NaiveTime,
    /// Minimum opening-range size, in ATRs
    pub min_range_atr_multiple: f64,
    /// Target distance as a multiple of the range size
    pub target_range_multiple: f64,
    /// Relative volume that earns the volume-confirmation bonus
    pub volume_confirmation: f64,
    /// Opposing wick as a fraction of bar range below which the break
    /// counts as clean
    pub clean_break_wick_ratio: f64,
    /// Body as a fraction of bar range above which the candle counts as
    /// strong
    pub strong_body_ratio: f64,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            eligible_from: NaiveTime::from_hms_opt(9, 45, 0).unwrap(),
            eligible_until: NaiveTime::from_hms_opt(11, 30, 0).unwrap(),
            min_range_atr_multiple: 0.5,
            target_range_multiple: 1.0,
            volume_confirmation: 1.2,
            clean_break_wick_ratio: 0.15,
            strong_body_ratio: 0.6,
        }
    }
}

impl BreakoutConfig {
    pub fn validate(&self) -> Result<(), StrategyConfigError> {
        if self.eligible_until <= self.eligible_from {
            return Err(StrategyConfigError::InvalidBreakoutWindow);
        }
        if self.min_range_atr_multiple <= 0.0 {
            return Err(StrategyConfigError::InvalidAtrMultiple(
                self.min_range_atr_multiple,
            ));
        }
        if self.target_range_multiple <= 0.0 {
            return Err(StrategyConfigError::InvalidAtrMultiple(
                self.target_range_multiple,
            ));
        }
        Ok(())
    }
}

/// EMA trend-pullback parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPullbackConfig {
    pub min_adx: f64,
    /// Composite trend-strength floor, 0-100
    pub min_trend_strength: f64,
    /// RSI pullback band for longs (retraced down into the band)
    pub long_rsi_low: f64,
    pub long_rsi_high: f64,
    /// RSI pullback band for shorts (retraced up into the band)
    pub short_rsi_low: f64,
    pub short_rsi_high: f64,
    pub stop_atr_multiple: f64,
    pub target_atr_multiple: f64,
    /// ADX level that earns the strong-trend bonus
    pub strong_adx: f64,
    /// Trend-strength level that earns the extra bonus
    pub strong_trend_strength: f64,
}

impl Default for TrendPullbackConfig {
    fn default() -> Self {
        Self {
            min_adx: 25.0,
            min_trend_strength: 40.0,
            long_rsi_low: 40.0,
            long_rsi_high: 55.0,
            short_rsi_low: 45.0,
            short_rsi_high: 60.0,
            stop_atr_multiple: 2.0,
            target_atr_multiple: 4.0,
            strong_adx: 35.0,
            strong_trend_strength: 60.0,
        }
    }
}

impl TrendPullbackConfig {
    pub fn validate(&self) -> Result<(), StrategyConfigError> {
        for (low, high) in [
            (self.long_rsi_low, self.long_rsi_high),
            (self.short_rsi_low, self.short_rsi_high),
        ] {
            if low >= high || low < 0.0 || high > 100.0 {
                return Err(StrategyConfigError::InvalidRsiBand { low, high });
            }
        }
        if self.stop_atr_multiple <= 0.0 {
            return Err(StrategyConfigError::InvalidAtrMultiple(self.stop_atr_multiple));
        }
        if self.target_atr_multiple <= 0.0 {
            return Err(StrategyConfigError::InvalidAtrMultiple(self.target_atr_multiple));
        }
        Ok(())
    }
}

/// Order-flow divergence parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFlowConfig {
    /// Bars of delta history required before the strategy is live
    pub lookback: usize,
    /// Bars on each side that define a swing point
    pub swing_window: usize,
    /// |cumulative delta| that marks institutional activity
    pub institutional_threshold: f64,
    /// Stop buffer beyond the swing extreme, in ATRs
    pub stop_buffer_atr: f64,
}

impl Default for OrderFlowConfig {
    fn default() -> Self {
        Self {
            lookback: 30,
            swing_window: 3,
            institutional_threshold: 1500.0,
            stop_buffer_atr: 0.25,
        }
    }
}

impl OrderFlowConfig {
    pub fn validate(&self) -> Result<(), StrategyConfigError> {
        if self.lookback < 10 {
            return Err(StrategyConfigError::InvalidLookback(self.lookback));
        }
        if self.swing_window == 0 || self.swing_window * 2 >= self.lookback {
            return Err(StrategyConfigError::InvalidLookback(self.swing_window));
        }
        if self.institutional_threshold <= 0.0 {
            return Err(StrategyConfigError::InvalidAtrMultiple(
                self.institutional_threshold,
            ));
        }
        Ok(())
    }
}

/// One strategy's parameters, statically tagged
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum StrategyParams {
    MeanReversion(MeanReversionConfig),
    Breakout(BreakoutConfig),
    TrendPullback(TrendPullbackConfig),
    OrderFlow(OrderFlowConfig),
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), StrategyConfigError> {
        match self {
            StrategyParams::MeanReversion(c) => c.validate(),
            StrategyParams::Breakout(c) => c.validate(),
            StrategyParams::TrendPullback(c) => c.validate(),
            StrategyParams::OrderFlow(c) => c.validate(),
        }
    }
}

/// Relative weights used for the confluence-weighted confidence average
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyWeights {
    pub mean_reversion: f64,
    pub breakout: f64,
    pub trend_pullback: f64,
    pub order_flow: f64,
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self {
            mean_reversion: 1.0,
            breakout: 1.2,
            trend_pullback: 1.0,
            order_flow: 1.3,
        }
    }
}

impl StrategyWeights {
    pub fn validate(&self) -> Result<(), StrategyConfigError> {
        for weight in [
            self.mean_reversion,
            self.breakout,
            self.trend_pullback,
            self.order_flow,
        ] {
            if weight <= 0.0 {
                return Err(StrategyConfigError::InvalidWeight(weight));
            }
        }
        Ok(())
    }

    pub fn for_strategy(&self, name: &str) -> f64 {
        match name {
            "mean_reversion" => self.mean_reversion,
            "breakout" => self.breakout,
            "trend_pullback" => self.trend_pullback,
            "order_flow" => self.order_flow,
            _ => 1.0,
        }
    }
}

/// The full strategy suite: all four configs plus weights and enable flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySuiteConfig {
    #[serde(default)]
    pub mean_reversion: MeanReversionConfig,
    #[serde(default)]
    pub breakout: BreakoutConfig,
    #[serde(default)]
    pub trend_pullback: TrendPullbackConfig,
    #[serde(default)]
    pub order_flow: OrderFlowConfig,
    #[serde(default)]
    pub weights: StrategyWeights,
    #[serde(default = "default_true")]
    pub mean_reversion_enabled: bool,
    #[serde(default = "default_true")]
    pub breakout_enabled: bool,
    #[serde(default = "default_true")]
    pub trend_pullback_enabled: bool,
    #[serde(default = "default_true")]
    pub order_flow_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for StrategySuiteConfig {
    fn default() -> Self {
        Self {
            mean_reversion: MeanReversionConfig::default(),
            breakout: BreakoutConfig::default(),
            trend_pullback: TrendPullbackConfig::default(),
            order_flow: OrderFlowConfig::default(),
            weights: StrategyWeights::default(),
            mean_reversion_enabled: true,
            breakout_enabled: true,
            trend_pullback_enabled: true,
            order_flow_enabled: true,
        }
    }
}

impl StrategySuiteConfig {
    /// The enabled strategies as tagged parameter sets, in evaluation
    /// order. This is the dispatch list the generator loop runs over.
    pub fn active_params(&self) -> Vec<StrategyParams> {
        let mut params = Vec::with_capacity(4);
        if self.mean_reversion_enabled {
            params.push(StrategyParams::MeanReversion(self.mean_reversion.clone()));
        }
        if self.breakout_enabled {
            params.push(StrategyParams::Breakout(self.breakout.clone()));
        }
        if self.trend_pullback_enabled {
            params.push(StrategyParams::TrendPullback(self.trend_pullback.clone()));
        }
        if self.order_flow_enabled {
            params.push(StrategyParams::OrderFlow(self.order_flow.clone()));
        }
        params
    }

    pub fn validate(&self) -> Result<(), StrategyConfigError> {
        self.mean_reversion.validate()?;
        self.breakout.validate()?;
        self.trend_pullback.validate()?;
        self.order_flow.validate()?;
        self.weights.validate()?;
        Ok(())
    }
}
