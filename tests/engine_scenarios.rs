//! End-to-end cycles through the public engine API: candle window in,
//! decision out, with trade state driven through the confirm calls the
//! way a live caller would.

use chrono::{DateTime, Duration, TimeZone, Utc};

use stuntman_engine::domain::candle::Candle;
use stuntman_engine::domain::performance::PerformanceTracker;
use stuntman_engine::domain::regime::MarketRegime;
use stuntman_engine::domain::risk::RiskStatus;
use stuntman_engine::domain::session::{SessionConfig, TimeOfDay, TradingSession};
use stuntman_engine::domain::signal::{Direction, SignalStrength};
use stuntman_engine::domain::snapshot::{EngineSnapshot, RecoveryStatus};
use stuntman_engine::engine::{
    thresholds, Decision, EngineConfig, EngineContext, EngineError, ExitInstruction, ExitReason,
    ThresholdConfig, TradeIntent,
};
use stuntman_engine::indicators::IndicatorSnapshot;

/// 10:00 exchange-local on a Monday, inside regular hours.
fn mid_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap()
}

/// A quiet one-minute window ending at `end`, pinned to `price`. Open and
/// close are equal so no strategy finds a setup in it.
fn pinned_window(price: f64, end: DateTime<Utc>, count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| Candle {
            time: end - Duration::minutes((count - 1 - i) as i64),
            open: price,
            high: price + 0.5,
            low: price - 0.5,
            close: price,
            volume: 1000.0,
        })
        .collect()
}

fn long_intent(contracts: u32) -> TradeIntent {
    TradeIntent {
        symbol: "ES".to_string(),
        direction: Direction::Long,
        contracts,
        entry: 5000.0,
        stop_loss: 4990.0,
        take_profit: 5020.0,
        confluence_score: 75.0,
        confidence: 80.0,
        strength: SignalStrength::Moderate,
        position_size_multiplier: 1.0,
        entry_atr: 5.0,
        contributors: vec!["trend_pullback"],
        reasons: Vec::new(),
        warnings: Vec::new(),
    }
}

#[test]
fn short_window_is_rejected() {
    let mut ctx = EngineContext::new(EngineConfig::default()).unwrap();
    let candles = pinned_window(5000.0, mid_morning(), 30);
    assert!(matches!(
        ctx.evaluate(&candles, mid_morning()),
        Err(EngineError::Indicator(_))
    ));
}

#[test]
fn quiet_market_takes_no_action() {
    let mut ctx = EngineContext::new(EngineConfig::default()).unwrap();
    let now = mid_morning();
    let output = ctx.evaluate(&pinned_window(5000.0, now, 60), now).unwrap();

    match output.decision {
        Decision::NoAction { reasons } => assert!(!reasons.is_empty()),
        other => panic!("expected NoAction, got {other:?}"),
    }
    assert!(ctx.open_trade.is_none());
}

/// Scale out at each level, then take profit, confirming the final fill.
#[test]
fn long_lifecycle_scale_out_then_take_profit() {
    let mut ctx = EngineContext::new(EngineConfig::default()).unwrap();
    let mut now = mid_morning();
    ctx.confirm_entry(&long_intent(4), now).unwrap();

    // Halfway to target: first scale-out level, 50% off
    now += Duration::minutes(1);
    let output = ctx.evaluate(&pinned_window(5010.0, now, 60), now).unwrap();
    match &output.decision {
        Decision::Exit { instructions } => {
            assert_eq!(
                instructions.as_slice(),
                &[ExitInstruction::Partial {
                    level_index: 0,
                    contracts: 2,
                    price: 5010.0
                }]
            );
        }
        other => panic!("expected Exit, got {other:?}"),
    }

    // Until the fill is confirmed nothing is booked and the same
    // instruction comes back on the next poll
    let trade = ctx.open_trade.as_ref().unwrap();
    assert_eq!(trade.state.remaining_contracts, 4);
    assert_eq!(trade.position.stop_loss, 4990.0);
    let repoll = ctx.evaluate(&pinned_window(5010.0, now, 60), now).unwrap();
    assert!(matches!(repoll.decision, Decision::Exit { .. }));

    // Confirmed fill: 50% off, stop to entry
    ctx.confirm_partial_exit(0, 2, 5010.0, now);
    let trade = ctx.open_trade.as_ref().unwrap();
    assert_eq!(trade.state.remaining_contracts, 2);
    assert_eq!(trade.position.stop_loss, 5000.0);

    // Same price again: a confirmed level must not re-fire
    now += Duration::minutes(1);
    let output = ctx.evaluate(&pinned_window(5010.0, now, 60), now).unwrap();
    assert!(matches!(output.decision, Decision::NoAction { .. }));

    // Three quarters of the way: second level, 25% off
    now += Duration::minutes(1);
    let output = ctx.evaluate(&pinned_window(5015.0, now, 60), now).unwrap();
    match &output.decision {
        Decision::Exit { instructions } => {
            assert!(instructions.iter().any(|i| matches!(
                i,
                ExitInstruction::Partial {
                    level_index: 1,
                    contracts: 1,
                    ..
                }
            )));
        }
        other => panic!("expected Exit, got {other:?}"),
    }
    ctx.confirm_partial_exit(1, 1, 5015.0, now);
    assert_eq!(ctx.open_trade.as_ref().unwrap().state.remaining_contracts, 1);

    // Target touch: full exit at the take-profit price
    now += Duration::minutes(1);
    let output = ctx.evaluate(&pinned_window(5021.0, now, 60), now).unwrap();
    match &output.decision {
        Decision::Exit { instructions } => {
            assert_eq!(
                instructions.as_slice(),
                &[ExitInstruction::Full {
                    price: 5020.0,
                    reason: ExitReason::TakeProfit
                }]
            );
        }
        other => panic!("expected Exit, got {other:?}"),
    }

    // 2 @ +10, 1 @ +15, 1 @ +20 points, $50 a point
    let pnl = ctx.confirm_full_exit(5020.0, output.regime, now).unwrap();
    assert_eq!(pnl, 2750.0);
    assert!(ctx.open_trade.is_none());
    assert_eq!(ctx.performance.consecutive_wins, 1);
    assert_eq!(ctx.performance.daily_pnl, 2750.0);
}

#[test]
fn hard_stop_closes_everything() {
    let mut ctx = EngineContext::new(EngineConfig::default()).unwrap();
    let now = mid_morning();
    ctx.confirm_entry(&long_intent(2), now).unwrap();

    let output = ctx.evaluate(&pinned_window(4989.0, now, 60), now).unwrap();
    match &output.decision {
        Decision::Exit { instructions } => {
            assert_eq!(
                instructions.as_slice(),
                &[ExitInstruction::Full {
                    price: 4990.0,
                    reason: ExitReason::HardStop
                }]
            );
        }
        other => panic!("expected Exit, got {other:?}"),
    }

    // -10 points x 2 contracts x $50
    let pnl = ctx.confirm_full_exit(4990.0, output.regime, now).unwrap();
    assert_eq!(pnl, -1000.0);
    assert_eq!(ctx.performance.consecutive_losses, 1);
}

#[test]
fn breached_daily_loss_halts_the_engine() {
    let mut ctx = EngineContext::new(EngineConfig::default()).unwrap();
    let now = mid_morning();

    ctx.risk.update_pnl(-1600.0, 0.0, now);
    assert_eq!(ctx.risk.state.status, RiskStatus::Halted);
    assert!(!ctx.risk.state.allow_new_trades);

    let output = ctx.evaluate(&pinned_window(5000.0, now, 60), now).unwrap();
    assert!(matches!(output.decision, Decision::NoAction { .. }));

    // A daily reset does not clear a trailing-drawdown halt, but a pure
    // daily-loss halt ends with the day
    ctx.reset_daily();
    assert_ne!(ctx.risk.state.status, RiskStatus::Halted);
}

#[test]
fn thresholds_stay_clamped_under_stress() {
    let regimes = [
        MarketRegime::TrendStrongUp,
        MarketRegime::TrendStrongDown,
        MarketRegime::TrendWeakUp,
        MarketRegime::TrendWeakDown,
        MarketRegime::RangeTight,
        MarketRegime::RangeWide,
        MarketRegime::HighVolatility,
        MarketRegime::LowVolatility,
        MarketRegime::NewsDriven,
        MarketRegime::Illiquid,
    ];
    let sessions = [
        TradingSession::Overnight,
        TradingSession::European,
        TradingSession::Regular,
    ];
    let times = [
        TimeOfDay::OpeningHour,
        TimeOfDay::Morning,
        TimeOfDay::Midday,
        TimeOfDay::Afternoon,
        TimeOfDay::PowerHour,
        TimeOfDay::Closed,
    ];

    let mut cold = PerformanceTracker::default();
    cold.consecutive_losses = 6;
    let mut hot = PerformanceTracker::default();
    hot.consecutive_wins = 6;

    let config = ThresholdConfig::default();
    for regime in regimes {
        for session in sessions {
            for time in times {
                for tracker in [&cold, &hot] {
                    let required = thresholds::compute(regime, session, time, tracker, &config);
                    assert!(
                        (30.0..=95.0).contains(&required.confluence),
                        "confluence {} out of clamp for {regime:?}/{session:?}/{time:?}",
                        required.confluence
                    );
                    assert!((50.0..=95.0).contains(&required.confidence));
                    assert!((1.0..=5.0).contains(&required.risk_reward));
                }
            }
        }
    }
}

#[test]
fn snapshot_round_trip_restores_open_trade() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.json");
    let now = mid_morning();

    let mut ctx = EngineContext::new(EngineConfig::default()).unwrap();
    ctx.confirm_entry(&long_intent(3), now).unwrap();
    ctx.performance
        .record_trade(250.0, MarketRegime::RangeWide, TradingSession::Regular, now);

    let snapshot = EngineSnapshot {
        saved_at: now,
        performance: ctx.performance.clone(),
        risk_state: ctx.risk.state.clone(),
        open_position: ctx.open_trade.as_ref().map(|t| t.position.clone()),
        position_state: ctx.open_trade.as_ref().map(|t| t.state.clone()),
    };
    snapshot.save(&path).unwrap();

    let (loaded, status) = EngineSnapshot::load(&path).unwrap();
    assert_eq!(status, RecoveryStatus::Recovered);
    let loaded = loaded.unwrap();
    assert_eq!(loaded.performance.daily_pnl, 250.0);
    let position = loaded.open_position.unwrap();
    assert_eq!(position.symbol, "ES");
    assert_eq!(position.contracts, 3);
    assert_eq!(
        loaded.position_state.unwrap().remaining_contracts,
        position.contracts
    );
}

#[test]
fn neutral_features_classify_as_low_volatility() {
    // A flat pinned window has no band width and unit volume
    let session = SessionConfig::default();
    let candles = pinned_window(5000.0, mid_morning(), 60);
    let snapshot = IndicatorSnapshot::compute(&candles, &session).unwrap();
    assert_eq!(
        MarketRegime::classify(&snapshot),
        MarketRegime::LowVolatility
    );
}
