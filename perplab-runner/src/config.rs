//! Serializable backtest configuration, loaded from TOML.
//!
//! Every section is `#[serde(default)]`, so a file only needs the keys it
//! overrides:
//!
//! ```toml
//! [simulation]
//! initial_equity = 25000.0
//! seed = 7
//!
//! [risk]
//! risk_per_trade = 0.005
//!
//! [exits]
//! time_stop_enabled = false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use perplab_core::cost::CostConfig;
use perplab_core::exit::ExitConfig;
use perplab_core::indicators::DEFAULT_ATR_PERIOD;
use perplab_core::risk::RiskConfig;
use perplab_core::{ConfigurationError, SimulationConfig};

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Validation(#[from] ConfigurationError),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// `[simulation]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    pub initial_equity: f64,
    pub seed: u64,
    pub atr_period: usize,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            initial_equity: 10_000.0,
            seed: 42,
            atr_period: DEFAULT_ATR_PERIOD,
        }
    }
}

/// Complete configuration for one backtest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub simulation: SimulationSection,
    pub risk: RiskConfig,
    pub exits: ExitConfig,
    pub costs: CostConfig,
}

impl BacktestConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.to_simulation_config().validate()?;
        Ok(())
    }

    /// Deterministic hash of the configuration.
    ///
    /// Two runs with identical configs (and identical inputs) produce
    /// identical results, so the id doubles as a reproducibility key.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    pub fn to_simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            initial_equity: self.simulation.initial_equity,
            seed: self.simulation.seed,
            atr_period: self.simulation.atr_period,
            risk: self.risk.clone(),
            exits: self.exits.clone(),
            costs: self.costs.clone(),
        }
    }
}
