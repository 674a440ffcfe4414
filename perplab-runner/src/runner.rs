//! Backtest runner: wires configuration, the simulation loop and metrics.
//!
//! Two entry points:
//! - `run_backtest()`: one configuration against one prepared input.
//! - `run_many()`: independent runs in parallel, results in job order.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use perplab_core::domain::{Bar, BarSequence, EquitySnapshot, SymbolMeta, Trade, TradeProposal};
use perplab_core::engine::{ExitFault, Rejection};
use perplab_core::{run_simulation, SimulationError};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
}

/// Materialized market data, proposals and symbol metadata for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestInput {
    pub bars: BarSequence,
    pub proposals: Vec<TradeProposal>,
    pub metas: HashMap<String, SymbolMeta>,
}

impl BacktestInput {
    /// Validate and order `bars`; index `metas` by symbol.
    pub fn new(
        bars: Vec<Bar>,
        proposals: Vec<TradeProposal>,
        metas: impl IntoIterator<Item = SymbolMeta>,
    ) -> Result<Self, RunError> {
        let bars = BarSequence::from_bars(bars).map_err(SimulationError::from)?;
        let metas = metas.into_iter().map(|m| (m.symbol.clone(), m)).collect();
        Ok(Self {
            bars,
            proposals,
            metas,
        })
    }
}

/// Optional observers for a single run.
#[derive(Clone, Copy, Default)]
pub struct RunHooks<'a> {
    /// Receives every per-bar equity snapshot.
    pub progress: Option<&'a dyn Fn(&EquitySnapshot)>,
    /// Checked between bars; when set the run stops and returns a partial result.
    pub cancel: Option<&'a AtomicBool>,
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub run_id: RunId,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquitySnapshot>,
    pub initial_equity: f64,
    pub final_equity: f64,
    pub rejections: Vec<Rejection>,
    pub exit_faults: Vec<ExitFault>,
    pub bars_processed: usize,
    pub cancelled: bool,
}

/// One unit of work for `run_many`.
#[derive(Debug, Clone)]
pub struct BacktestJob<'a> {
    pub config: BacktestConfig,
    pub input: &'a BacktestInput,
}

/// Run one backtest.
pub fn run_backtest(
    config: &BacktestConfig,
    input: &BacktestInput,
    hooks: RunHooks<'_>,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let sim_config = config.to_simulation_config();

    let outcome = run_simulation(
        &input.bars,
        &input.proposals,
        &input.metas,
        &sim_config,
        hooks.progress,
        hooks.cancel,
    )?;

    let metrics = PerformanceMetrics::compute(
        &outcome.trades,
        &outcome.equity_values(),
        outcome.initial_equity,
        outcome.final_equity,
    );
    info!(
        run_id = %run_id,
        trades = metrics.total_trades,
        total_return = metrics.total_return,
        max_drawdown = metrics.max_drawdown,
        cancelled = outcome.cancelled,
        "backtest complete"
    );

    Ok(BacktestResult {
        run_id,
        metrics,
        trades: outcome.trades,
        equity_curve: outcome.equity_curve,
        initial_equity: outcome.initial_equity,
        final_equity: outcome.final_equity,
        rejections: outcome.rejections,
        exit_faults: outcome.exit_faults,
        bars_processed: outcome.bars_processed,
        cancelled: outcome.cancelled,
    })
}

/// Run independent backtests in parallel.
///
/// Each run owns its ledger, so results match sequential execution.
/// A failing job does not affect the others.
pub fn run_many(jobs: &[BacktestJob<'_>]) -> Vec<Result<BacktestResult, RunError>> {
    jobs.par_iter()
        .map(|job| run_backtest(&job.config, job.input, RunHooks::default()))
        .collect()
}
