//! Risk parameters.

use serde::{Deserialize, Serialize};

use crate::domain::VolClass;
use crate::error::ConfigurationError;

/// Leverage ceiling per volatility class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeverageCaps {
    pub core: u32,
    pub major: u32,
    pub alt: u32,
}

impl Default for LeverageCaps {
    fn default() -> Self {
        Self {
            core: 15,
            major: 6,
            alt: 3,
        }
    }
}

impl LeverageCaps {
    /// Class cap, or `None` for unclassified symbols.
    pub fn cap_for(&self, class: VolClass) -> Option<u32> {
        match class {
            VolClass::Core => Some(self.core),
            VolClass::Major => Some(self.major),
            VolClass::Alt => Some(self.alt),
            VolClass::Unclassified => None,
        }
    }
}

/// Per-trade and portfolio risk parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Fraction of equity risked per trade if the stop is hit.
    pub risk_per_trade: f64,
    /// Cap on Σ open risk as a fraction of equity.
    pub max_portfolio_risk: f64,
    pub max_concurrent_positions: usize,
    /// Minimum entry-to-liquidation distance as a fraction of entry.
    pub liq_buffer_min_pct: f64,
    /// Z: entry-to-liquidation distance in ATRs.
    pub entry_buffer_atr_mult: f64,
    /// Y: stop-to-liquidation distance in ATRs.
    pub sl_buffer_atr_mult: f64,
    pub stop_atr_mult: f64,
    pub trailing_atr_mult: f64,
    /// Take-profit distance as a multiple of stop distance.
    pub risk_reward_ratio: f64,
    pub leverage_caps: LeverageCaps,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade: 0.01,
            max_portfolio_risk: 0.03,
            max_concurrent_positions: 5,
            liq_buffer_min_pct: 0.02,
            entry_buffer_atr_mult: 3.0,
            sl_buffer_atr_mult: 1.5,
            stop_atr_mult: 2.0,
            trailing_atr_mult: 2.0,
            risk_reward_ratio: 1.5,
            leverage_caps: LeverageCaps::default(),
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.risk_per_trade > 0.0 && self.risk_per_trade < 1.0) {
            return Err(ConfigurationError::param(
                "risk_per_trade",
                format!("{} is outside (0, 1)", self.risk_per_trade),
            ));
        }
        if !(self.max_portfolio_risk > 0.0 && self.max_portfolio_risk <= 1.0) {
            return Err(ConfigurationError::param(
                "max_portfolio_risk",
                format!("{} is outside (0, 1]", self.max_portfolio_risk),
            ));
        }
        if self.max_concurrent_positions == 0 {
            return Err(ConfigurationError::param(
                "max_concurrent_positions",
                "must be at least 1",
            ));
        }
        if !(0.02..=0.05).contains(&self.liq_buffer_min_pct) {
            return Err(ConfigurationError::param(
                "liq_buffer_min_pct",
                format!("{} is outside [0.02, 0.05]", self.liq_buffer_min_pct),
            ));
        }
        for (field, value) in [
            ("entry_buffer_atr_mult", self.entry_buffer_atr_mult),
            ("sl_buffer_atr_mult", self.sl_buffer_atr_mult),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigurationError::param(field, "must be non-negative"));
            }
        }
        for (field, value) in [
            ("stop_atr_mult", self.stop_atr_mult),
            ("trailing_atr_mult", self.trailing_atr_mult),
            ("risk_reward_ratio", self.risk_reward_ratio),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigurationError::param(field, "must be positive"));
            }
        }
        let caps = self.leverage_caps;
        if caps.core < 1 || caps.major < 1 || caps.alt < 1 {
            return Err(ConfigurationError::param(
                "leverage_caps",
                "every class cap must be at least 1",
            ));
        }
        Ok(())
    }
}
