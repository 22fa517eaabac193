//! Stuntman - Adaptive Futures Decision Engine Library
//!
//! Regime-aware signal generation, confluence scoring and risk control
//! for intraday futures trading. The engine itself is pure and
//! synchronous; callers feed it candles and account state through the
//! port traits and act on the decisions it returns.
//!
//! # Modules
//!
//! - `domain`: Core business logic (Candle, Position, RiskEngine, PerformanceTracker)
//! - `indicators`: Technical indicator kernels (EMA, RSI, MACD, ATR, VWAP, ADX)
//! - `strategy`: Signal generation (MeanReversion, Breakout, TrendPullback, OrderFlow, Confluence)
//! - `engine`: Adaptive thresholds, position sizing, position management, cycle orchestration
//! - `ports`: Trait abstractions (MarketDataPort, AccountPort, ExecutionPort)
//! - `config`: Configuration loading and validation
//! - `application`: Trading loop wiring ports to the engine

pub mod application;
pub mod config;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod ports;
pub mod strategy;
