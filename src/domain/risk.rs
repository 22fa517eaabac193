//! Risk Engine
//!
//! Account-level trade validation and a violation/halt state machine that
//! runs independently of signal quality. Violations are deduplicated by
//! (type, severity): a repeat occurrence updates the existing record in
//! place. Overall status is derived each cycle from the worst severity
//! present. Violations raised or updated in a call are returned to the
//! caller as plain events for alerting; the engine holds no callbacks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use super::session::SessionConfig;
use super::signal::Direction;

/// Fraction of a limit at which a warning is raised
pub const WARNING_FRACTION: f64 = 0.75;
/// Fraction of a limit at which the violation becomes critical
pub const CRITICAL_FRACTION: f64 = 0.90;

#[derive(Debug, Error)]
pub enum RiskConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositiveLimit { field: &'static str, value: f64 },
    #[error("Scaling tiers must have descending profit floors")]
    UnorderedScalingTiers,
    #[error("Scaling tier allows zero contracts")]
    EmptyScalingTier,
}

/// What the account is allowed to do right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskStatus {
    Normal,
    Warning,
    Critical,
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Warning,
    Critical,
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    DailyLoss,
    TrailingDrawdown,
    PositionSize,
    TotalExposure,
    TradeRisk,
    StopWidth,
    TradingHours,
    ScalingPlan,
}

/// A limit breach or near-breach. One record per (type, severity) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskViolation {
    pub violation_type: ViolationType,
    pub severity: ViolationSeverity,
    /// Observed value that triggered the violation
    pub value: f64,
    /// The limit it was measured against
    pub limit: f64,
    /// Human-readable action taken
    pub action: String,
    pub raised_at: DateTime<Utc>,
}

/// One tier of the contract-scaling plan. The first tier is the default
/// cap; a deeper tier takes over once daily P&L falls below its
/// `profit_floor`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScalingTier {
    /// Daily P&L below which this tier's cap applies
    pub profit_floor: f64,
    pub max_contracts: u32,
}

/// Static account constraints, owned by the caller and read-only here
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Maximum loss allowed in one day, dollars
    pub max_daily_loss: f64,
    /// Maximum trailing drawdown from the high-water mark, dollars
    pub max_trailing_drawdown: f64,
    /// Per-symbol position cap, contracts
    pub max_position_contracts: u32,
    /// Aggregate notional exposure cap, dollars
    pub max_total_exposure: f64,
    /// Dollar risk cap for a single trade (stop distance x point value)
    pub per_trade_risk: f64,
    /// Maximum stop distance as percent of entry price
    pub max_stop_percent: f64,
    /// Dollars per point per contract
    pub point_value: f64,
    /// Contract-scaling plan, descending profit floors
    pub scaling_tiers: Vec<ScalingTier>,
    /// Whether trades may be opened outside regular hours
    pub allow_overnight: bool,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_daily_loss: 1500.0,
            max_trailing_drawdown: 4000.0,
            max_position_contracts: 5,
            max_total_exposure: 1_500_000.0,
            per_trade_risk: 500.0,
            max_stop_percent: 1.0,
            point_value: 50.0,
            scaling_tiers: vec![
                ScalingTier { profit_floor: 0.0, max_contracts: 5 },
                ScalingTier { profit_floor: -500.0, max_contracts: 3 },
                ScalingTier { profit_floor: -1000.0, max_contracts: 1 },
            ],
            allow_overnight: false,
        }
    }
}

impl RiskLimits {
    /// Reject malformed limits at configuration load, not mid-cycle.
    pub fn validate(&self) -> Result<(), RiskConfigError> {
        let positive = [
            ("max_daily_loss", self.max_daily_loss),
            ("max_trailing_drawdown", self.max_trailing_drawdown),
            ("max_total_exposure", self.max_total_exposure),
            ("per_trade_risk", self.per_trade_risk),
            ("max_stop_percent", self.max_stop_percent),
            ("point_value", self.point_value),
        ];
        for (field, value) in positive {
            if value <= 0.0 {
                return Err(RiskConfigError::NonPositiveLimit { field, value });
            }
        }
        if self.max_position_contracts == 0 {
            return Err(RiskConfigError::NonPositiveLimit {
                field: "max_position_contracts",
                value: 0.0,
            });
        }
        for pair in self.scaling_tiers.windows(2) {
            if pair[1].profit_floor >= pair[0].profit_floor {
                return Err(RiskConfigError::UnorderedScalingTiers);
            }
        }
        if self.scaling_tiers.iter().any(|t| t.max_contracts == 0) {
            return Err(RiskConfigError::EmptyScalingTier);
        }
        Ok(())
    }

    /// Contracts allowed by the scaling plan at today's P&L level. Each
    /// tier's cap holds until P&L drops below the next tier's floor, so
    /// the tiers read as bands: the deepest breached floor wins.
    pub fn scaling_cap(&self, daily_pnl: f64) -> u32 {
        let mut cap = self
            .scaling_tiers
            .first()
            .map(|t| t.max_contracts)
            .unwrap_or(self.max_position_contracts);
        for tier in &self.scaling_tiers {
            if daily_pnl < tier.profit_floor {
                cap = tier.max_contracts;
            }
        }
        cap
    }
}

/// Mutable per-account risk state. Exactly one per trading account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskState {
    pub daily_pnl: f64,
    pub weekly_pnl: f64,
    pub unrealized_pnl: f64,
    pub high_water_mark: f64,
    pub current_drawdown: f64,
    pub exposure_by_symbol: HashMap<String, f64>,
    pub total_exposure: f64,
    pub status: RiskStatus,
    pub allow_new_trades: bool,
    pub violations: Vec<RiskViolation>,
}

impl Default for RiskState {
    fn default() -> Self {
        Self {
            daily_pnl: 0.0,
            weekly_pnl: 0.0,
            unrealized_pnl: 0.0,
            high_water_mark: 0.0,
            current_drawdown: 0.0,
            exposure_by_symbol: HashMap::new(),
            total_exposure: 0.0,
            status: RiskStatus::Normal,
            allow_new_trades: true,
            violations: Vec::new(),
        }
    }
}

/// Result of validating a proposed trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeValidation {
    pub allowed: bool,
    /// Largest size the checks permit (0 when rejected)
    pub max_contracts: u32,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    /// Set when the stop had to be tightened to satisfy the width cap
    pub adjusted_stop_loss: Option<f64>,
}

impl TradeValidation {
    fn rejected(error: String) -> Self {
        Self {
            allowed: false,
            max_contracts: 0,
            warnings: Vec::new(),
            errors: vec![error],
            adjusted_stop_loss: None,
        }
    }
}

/// The risk state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskEngine {
    limits: RiskLimits,
    pub state: RiskState,
}

impl RiskEngine {
    pub fn new(limits: RiskLimits) -> Self {
        Self {
            limits,
            state: RiskState::default(),
        }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Validate a proposed trade, reducing size where a cap allows it and
    /// rejecting outright where none does. Checks run in a fixed order;
    /// the first hard failure stops evaluation.
    #[allow(clippy::too_many_arguments)]
    pub fn validate_trade(
        &mut self,
        symbol: &str,
        direction: Direction,
        contracts: u32,
        entry: f64,
        stop: f64,
        _target: f64,
        now: DateTime<Utc>,
        session: &SessionConfig,
    ) -> TradeValidation {
        let mut warnings = Vec::new();
        let mut size = contracts;
        let mut adjusted_stop_loss = None;

        // (1) halted / trading disabled
        if self.state.status == RiskStatus::Halted || !self.state.allow_new_trades {
            return TradeValidation::rejected(format!(
                "New trades disabled (status {:?})",
                self.state.status
            ));
        }

        // (2) trading hours
        if !self.limits.allow_overnight && !session.is_regular_hours(now) {
            self.raise_violation(
                ViolationType::TradingHours,
                ViolationSeverity::Warning,
                0.0,
                0.0,
                "Trade rejected outside regular hours".to_string(),
                now,
            );
            return TradeValidation::rejected("Outside regular trading hours".to_string());
        }

        // (3) per-symbol position cap
        if size > self.limits.max_position_contracts {
            warnings.push(format!(
                "Size reduced from {} to per-symbol cap {}",
                size, self.limits.max_position_contracts
            ));
            size = self.limits.max_position_contracts;
        }

        // (4) aggregate exposure cap
        let per_contract_notional = entry * self.limits.point_value;
        let headroom = self.limits.max_total_exposure - self.state.total_exposure;
        if per_contract_notional > 0.0 {
            let exposure_cap = (headroom / per_contract_notional).floor().max(0.0) as u32;
            if exposure_cap == 0 {
                self.raise_violation(
                    ViolationType::TotalExposure,
                    ViolationSeverity::Warning,
                    self.state.total_exposure,
                    self.limits.max_total_exposure,
                    "Trade rejected: no exposure headroom".to_string(),
                    now,
                );
                return TradeValidation::rejected("Aggregate exposure cap reached".to_string());
            }
            if size > exposure_cap {
                warnings.push(format!(
                    "Size reduced from {} to {} by exposure cap",
                    size, exposure_cap
                ));
                size = exposure_cap;
            }
        }

        // (5) scaling plan
        let scaling_cap = self.limits.scaling_cap(self.state.daily_pnl);
        if size > scaling_cap {
            warnings.push(format!(
                "Size reduced from {} to {} by scaling plan (daily P&L {:.2})",
                size, scaling_cap, self.state.daily_pnl
            ));
            size = scaling_cap;
        }

        // (6) stop width cap: tighten, never widen; warn, never block.
        // The dollar-risk checks below run against the tightened stop.
        let mut stop_distance = (entry - stop).abs();
        let max_stop_distance = entry * self.limits.max_stop_percent / 100.0;
        if stop_distance > max_stop_distance {
            let tightened = match direction {
                Direction::Short => entry + max_stop_distance,
                _ => entry - max_stop_distance,
            };
            warnings.push(format!(
                "Stop tightened from {:.2} to {:.2} by the max stop width cap",
                stop, tightened
            ));
            adjusted_stop_loss = Some(tightened);
            stop_distance = max_stop_distance;
        }

        // (7) per-trade dollar risk cap
        let risk_per_contract = stop_distance * self.limits.point_value;
        if risk_per_contract > 0.0 {
            let risk_cap = (self.limits.per_trade_risk / risk_per_contract).floor() as u32;
            if risk_cap == 0 {
                return TradeValidation::rejected(format!(
                    "Stop distance {:.2} risks more than the per-trade cap ${:.2} even at 1 contract",
                    stop_distance, self.limits.per_trade_risk
                ));
            }
            if size > risk_cap {
                warnings.push(format!(
                    "Size reduced from {} to {} by per-trade risk cap",
                    size, risk_cap
                ));
                size = risk_cap;
            }
        }

        // (8) projected daily loss
        if risk_per_contract > 0.0 {
            let loss_headroom = self.limits.max_daily_loss + self.state.daily_pnl;
            let safe = (loss_headroom / risk_per_contract).floor().max(0.0) as u32;
            if safe == 0 {
                self.raise_violation(
                    ViolationType::DailyLoss,
                    ViolationSeverity::Warning,
                    self.state.daily_pnl,
                    self.limits.max_daily_loss,
                    "Trade rejected: stop-out would breach the daily loss limit".to_string(),
                    now,
                );
                return TradeValidation::rejected(
                    "Worst-case stop-out would breach the daily loss limit".to_string(),
                );
            }
            if size > safe {
                warnings.push(format!(
                    "Size reduced from {} to {} to keep worst case inside the daily loss limit",
                    size, safe
                ));
                size = safe;
            }
        }

        // (9) projected trailing drawdown
        if risk_per_contract > 0.0 {
            let dd_headroom = self.limits.max_trailing_drawdown - self.state.current_drawdown;
            let safe = (dd_headroom / risk_per_contract).floor().max(0.0) as u32;
            if safe == 0 {
                return TradeValidation::rejected(
                    "Worst-case stop-out would breach the trailing drawdown limit".to_string(),
                );
            }
            if size > safe {
                warnings.push(format!(
                    "Size reduced from {} to {} to keep worst case inside the drawdown limit",
                    size, safe
                ));
                size = safe;
            }
        }

        tracing::debug!(
            symbol,
            requested = contracts,
            granted = size,
            "trade validation passed"
        );

        TradeValidation {
            allowed: size > 0,
            max_contracts: size,
            warnings,
            errors: Vec::new(),
            adjusted_stop_loss,
        }
    }

    /// Ingest a P&L update: recompute the high-water mark (monotonic),
    /// drawdown, and re-evaluate the daily-loss and drawdown limits.
    /// Returns the violations raised or updated by this call.
    pub fn update_pnl(
        &mut self,
        realized_daily: f64,
        unrealized: f64,
        now: DateTime<Utc>,
    ) -> Vec<RiskViolation> {
        self.state.weekly_pnl += realized_daily - self.state.daily_pnl;
        self.state.daily_pnl = realized_daily;
        self.state.unrealized_pnl = unrealized;

        let equity = self.state.weekly_pnl + unrealized;
        if equity > self.state.high_water_mark {
            self.state.high_water_mark = equity;
        }
        self.state.current_drawdown = self.state.high_water_mark - equity;

        let mut events = Vec::new();
        events.extend(self.check_loss_limit(
            ViolationType::DailyLoss,
            -self.state.daily_pnl,
            self.limits.max_daily_loss,
            now,
        ));
        events.extend(self.check_loss_limit(
            ViolationType::TrailingDrawdown,
            self.state.current_drawdown,
            self.limits.max_trailing_drawdown,
            now,
        ));
        self.recompute_status();
        events
    }

    /// Recompute per-symbol and aggregate notional exposure.
    pub fn update_positions(&mut self, exposures: &[(String, f64)]) {
        self.state.exposure_by_symbol.clear();
        for (symbol, notional) in exposures {
            *self
                .state
                .exposure_by_symbol
                .entry(symbol.clone())
                .or_insert(0.0) += notional.abs();
        }
        self.state.total_exposure = self.state.exposure_by_symbol.values().sum();
    }

    /// Clear daily-loss violations and, unless still halted by something
    /// else, restore trading. Daily P&L restarts at zero.
    pub fn reset_daily(&mut self) {
        self.state
            .violations
            .retain(|v| v.violation_type != ViolationType::DailyLoss);
        self.state.daily_pnl = 0.0;
        self.recompute_status();
        if self.state.status != RiskStatus::Halted {
            self.state.allow_new_trades = true;
        }
        tracing::info!(status = ?self.state.status, "daily risk reset");
    }

    /// Clear only the weekly P&L accumulator.
    pub fn reset_weekly(&mut self) {
        self.state.weekly_pnl = 0.0;
        tracing::info!("weekly risk reset");
    }

    /// Record a violation, deduplicated by (type, severity): a repeat
    /// updates value and timestamp in place instead of appending.
    pub fn raise_violation(
        &mut self,
        violation_type: ViolationType,
        severity: ViolationSeverity,
        value: f64,
        limit: f64,
        action: String,
        now: DateTime<Utc>,
    ) -> RiskViolation {
        if let Some(existing) = self
            .state
            .violations
            .iter_mut()
            .find(|v| v.violation_type == violation_type && v.severity == severity)
        {
            existing.value = value;
            existing.raised_at = now;
            existing.action = action;
            return existing.clone();
        }
        let violation = RiskViolation {
            violation_type,
            severity,
            value,
            limit,
            action,
            raised_at: now,
        };
        tracing::warn!(?violation_type, ?severity, value, limit, "risk violation raised");
        self.state.violations.push(violation.clone());
        violation
    }

    /// Tiered check of a loss-style metric against its limit:
    /// >= limit is a halt, >= 90% critical, >= 75% warning.
    fn check_loss_limit(
        &mut self,
        violation_type: ViolationType,
        loss: f64,
        limit: f64,
        now: DateTime<Utc>,
    ) -> Vec<RiskViolation> {
        let mut events = Vec::new();
        if loss >= limit {
            events.push(self.raise_violation(
                violation_type,
                ViolationSeverity::Halt,
                loss,
                limit,
                "Trading halted".to_string(),
                now,
            ));
            self.state.allow_new_trades = false;
        } else if loss >= limit * CRITICAL_FRACTION {
            events.push(self.raise_violation(
                violation_type,
                ViolationSeverity::Critical,
                loss,
                limit,
                "New trades disabled".to_string(),
                now,
            ));
            self.state.allow_new_trades = false;
        } else if loss >= limit * WARNING_FRACTION {
            events.push(self.raise_violation(
                violation_type,
                ViolationSeverity::Warning,
                loss,
                limit,
                "Approaching limit".to_string(),
                now,
            ));
        }
        events
    }

    /// Derive overall status from the worst severity present.
    fn recompute_status(&mut self) {
        let worst = self.state.violations.iter().map(|v| v.severity).max();
        self.state.status = match worst {
            Some(ViolationSeverity::Halt) => RiskStatus::Halted,
            Some(ViolationSeverity::Critical) => RiskStatus::Critical,
            Some(ViolationSeverity::Warning) => RiskStatus::Warning,
            None => RiskStatus::Normal,
        };
        if self.state.status == RiskStatus::Halted {
            self.state.allow_new_trades = false;
        }
    }
}
