//! Core domain types: candles, sessions, signals, regimes, positions,
//! risk, and performance tracking. Everything here is synchronous and
//! free of I/O except the snapshot persistence helpers.

pub mod candle;
pub mod performance;
pub mod position;
pub mod regime;
pub mod risk;
pub mod session;
pub mod signal;
pub mod snapshot;

pub use candle::{Candle, CandleError, MIN_CANDLES};
pub use performance::{PerformanceTracker, TradeResult, WinLossTally};
pub use position::{
    AdvancedPositionState, PartialExit, Position, PositionError, ScaleOutLevel, StopAction,
};
pub use regime::MarketRegime;
pub use risk::{
    RiskEngine, RiskLimits, RiskState, RiskStatus, RiskViolation, ScalingTier, TradeValidation,
    ViolationSeverity, ViolationType,
};
pub use session::{SessionConfig, TimeOfDay, TradingSession};
pub use signal::{Direction, MasterSignal, SignalStrength, StrategySignal};
pub use snapshot::{EngineSnapshot, PersistError, RecoveryStatus};
