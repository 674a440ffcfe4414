//! Simulation configuration and outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cost::CostConfig;
use crate::domain::{EquitySnapshot, Trade};
use crate::error::ConfigurationError;
use crate::exit::ExitConfig;
use crate::indicators::DEFAULT_ATR_PERIOD;
use crate::risk::{RiskConfig, SizingReason};

/// Everything a single run needs besides market data and proposals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub initial_equity: f64,
    /// Seed for the slippage jitter.
    pub seed: u64,
    pub atr_period: usize,
    pub risk: RiskConfig,
    pub exits: ExitConfig,
    pub costs: CostConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_equity: 10_000.0,
            seed: 42,
            atr_period: DEFAULT_ATR_PERIOD,
            risk: RiskConfig::default(),
            exits: ExitConfig::default(),
            costs: CostConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.initial_equity > 0.0 && self.initial_equity.is_finite()) {
            return Err(ConfigurationError::param(
                "initial_equity",
                "must be positive",
            ));
        }
        if self.atr_period == 0 {
            return Err(ConfigurationError::param("atr_period", "must be at least 1"));
        }
        self.risk.validate()?;
        self.exits.validate()?;
        self.costs.validate()
    }
}

/// A proposal the sizer or portfolio guard turned down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub reasons: Vec<SizingReason>,
}

/// An exit check skipped for one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitFault {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub error: String,
}

/// Result of one simulation. Returned for cancelled runs too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub initial_equity: f64,
    pub final_equity: f64,
    pub trades: Vec<Trade>,
    /// One pre-update snapshot per processed bar.
    pub equity_curve: Vec<EquitySnapshot>,
    pub total_fees: f64,
    pub total_funding: f64,
    pub total_slippage: f64,
    pub rejections: Vec<Rejection>,
    pub exit_faults: Vec<ExitFault>,
    pub bars_processed: usize,
    pub cancelled: bool,
}

impl SimulationOutcome {
    /// Equity values of every snapshot followed by final equity.
    pub fn equity_values(&self) -> Vec<f64> {
        self.equity_curve
            .iter()
            .map(|s| s.equity)
            .chain(std::iter::once(self.final_equity))
            .collect()
    }
}
