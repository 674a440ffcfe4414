//! PerpLab Runner: run configuration, backtest orchestration, metrics.
//!
//! This crate builds on `perplab-core` to provide:
//! - TOML-loadable `BacktestConfig` with a deterministic run id
//! - Single-run and parallel multi-run entry points
//! - Performance aggregation over trades and the equity curve
//! - Tracing subscriber initialisation

pub mod config;
pub mod logging;
pub mod metrics;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, RunId, SimulationSection};
pub use logging::init_tracing;
pub use metrics::PerformanceMetrics;
pub use runner::{
    run_backtest, run_many, BacktestInput, BacktestJob, BacktestResult, RunError, RunHooks,
};
