//! Trading Loop
//!
//! Wires the ports to the engine: fetch account and candle state, run one
//! evaluation cycle, execute whatever the engine decided, and confirm
//! fills back into the context. Execution failures are reported and never
//! retried; the engine's trade state is only mutated on confirmed fills.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::path::PathBuf;

use crate::config::RuntimeSection;
use crate::domain::candle::validate_series;
use crate::domain::snapshot::{EngineSnapshot, RecoveryStatus};
use crate::engine::{CycleOutput, Decision, EngineContext, ExitInstruction, TradeIntent};
use crate::ports::{AccountPort, ExecutionPort, MarketDataPort};

pub struct Trader<M, A, E> {
    ctx: EngineContext,
    market: M,
    account: A,
    execution: E,
    runtime: RuntimeSection,
    snapshot_path: Option<PathBuf>,
    last_trading_day: Option<NaiveDate>,
}

impl<M, A, E> Trader<M, A, E>
where
    M: MarketDataPort,
    A: AccountPort,
    E: ExecutionPort,
{
    pub fn new(
        ctx: EngineContext,
        market: M,
        account: A,
        execution: E,
        runtime: RuntimeSection,
        snapshot_path: Option<PathBuf>,
    ) -> Self {
        Self {
            ctx,
            market,
            account,
            execution,
            runtime,
            snapshot_path,
            last_trading_day: None,
        }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Restore persisted state if a snapshot exists.
    pub fn recover(&mut self) -> Result<RecoveryStatus> {
        let Some(path) = self.snapshot_path.clone() else {
            return Ok(RecoveryStatus::Fresh);
        };
        let (snapshot, status) =
            EngineSnapshot::load(&path).context("failed to load engine snapshot")?;
        if let Some(snapshot) = snapshot {
            self.ctx.performance = snapshot.performance;
            self.ctx.risk.state = snapshot.risk_state;
            self.ctx.open_trade = match (snapshot.open_position, snapshot.position_state) {
                (Some(position), Some(state)) => {
                    Some(crate::engine::OpenTrade { position, state })
                }
                _ => None,
            };
        }
        Ok(status)
    }

    /// One full poll: account update, evaluation, execution, persistence.
    pub fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleOutput> {
        self.roll_trading_day(now);

        let account = self
            .account
            .snapshot()
            .context("account snapshot failed")?;
        let violations =
            self.ctx
                .risk
                .update_pnl(account.realized_daily_pnl, account.unrealized_pnl, now);
        for violation in &violations {
            tracing::warn!(?violation, "risk violation");
        }
        self.ctx.risk.update_positions(&account.exposures);

        let candles = self
            .market
            .fetch_candles(&self.ctx.config().symbol, self.runtime.candle_window)
            .context("candle fetch failed")?;
        validate_series(&candles).context("market data returned an invalid candle series")?;

        let output = self.ctx.evaluate(&candles, now)?;
        match &output.decision {
            Decision::Enter(intent) => self.execute_entry(intent.clone(), now),
            Decision::Exit { instructions } => {
                self.execute_exits(instructions.clone(), output.regime, now)
            }
            Decision::NoAction { reasons } => {
                tracing::debug!(?reasons, "no action");
            }
        }

        self.persist(now);
        Ok(output)
    }

    fn execute_entry(&mut self, intent: TradeIntent, now: DateTime<Utc>) {
        match self.execution.execute_entry(&intent) {
            Ok(report) => {
                let mut filled = intent;
                filled.entry = report.fill_price;
                filled.contracts = report.filled_contracts;
                if let Err(error) = self.ctx.confirm_entry(&filled, now) {
                    tracing::error!(%error, "fill confirmed but position rejected");
                } else {
                    tracing::info!(
                        price = report.fill_price,
                        contracts = report.filled_contracts,
                        "entry filled"
                    );
                }
            }
            Err(error) => {
                // No retry; the next cycle re-evaluates from scratch
                tracing::error!(%error, "entry execution failed");
            }
        }
    }

    fn execute_exits(
        &mut self,
        instructions: Vec<ExitInstruction>,
        regime: crate::domain::regime::MarketRegime,
        now: DateTime<Utc>,
    ) {
        let Some((symbol, direction, remaining)) = self.ctx.open_trade.as_ref().map(|t| {
            (
                t.position.symbol.clone(),
                t.position.direction,
                t.state.remaining_contracts,
            )
        }) else {
            return;
        };

        for instruction in instructions {
            match instruction {
                ExitInstruction::Partial {
                    level_index,
                    contracts,
                    price,
                } => match self.execution.execute_exit(&symbol, direction, contracts) {
                    Ok(report) => {
                        self.ctx.confirm_partial_exit(
                            level_index,
                            report.filled_contracts,
                            report.fill_price,
                            now,
                        );
                        tracing::info!(
                            level = level_index,
                            contracts = report.filled_contracts,
                            price = report.fill_price,
                            "partial exit filled"
                        );
                    }
                    Err(error) => {
                        // No retry; the level is re-issued next cycle
                        tracing::error!(%error, contracts, price, "partial exit failed");
                    }
                },
                ExitInstruction::Full { price, reason } => {
                    match self.execution.execute_exit(&symbol, direction, remaining) {
                        Ok(report) => {
                            let pnl = self.ctx.confirm_full_exit(report.fill_price, regime, now);
                            tracing::info!(
                                ?reason,
                                price = report.fill_price,
                                pnl,
                                "position closed"
                            );
                        }
                        Err(error) => {
                            tracing::error!(%error, ?reason, price, "full exit failed");
                        }
                    }
                }
            }
        }
    }

    /// Reset daily risk and performance state when the exchange-local
    /// calendar day changes.
    fn roll_trading_day(&mut self, now: DateTime<Utc>) {
        let offset = chrono::FixedOffset::east_opt(
            self.ctx.config().session.utc_offset_hours * 3600,
        );
        let today = match offset {
            Some(offset) => now.with_timezone(&offset).date_naive(),
            None => now.date_naive(),
        };
        if let Some(last) = self.last_trading_day {
            if today != last {
                tracing::info!(%today, "new trading day");
                self.ctx.reset_daily();
            }
        }
        self.last_trading_day = Some(today);
    }

    fn persist(&self, now: DateTime<Utc>) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        let snapshot = EngineSnapshot {
            saved_at: now,
            performance: self.ctx.performance.clone(),
            risk_state: self.ctx.risk.state.clone(),
            open_position: self.ctx.open_trade.as_ref().map(|t| t.position.clone()),
            position_state: self.ctx.open_trade.as_ref().map(|t| t.state.clone()),
        };
        if let Err(error) = snapshot.save(path) {
            tracing::warn!(%error, "snapshot save failed");
        }
    }
}
