//! Exit parameters.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::risk::RiskConfig;

/// Serializable exit settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    pub trailing_enabled: bool,
    pub partial_enabled: bool,
    pub time_stop_enabled: bool,
    /// Fraction of the open quantity closed at the partial target.
    pub partial_exit_ratio: f64,
    /// Partial target as a fraction of the entry-to-take-profit distance.
    pub partial_target_fraction: f64,
    pub max_holding_hours: f64,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            trailing_enabled: true,
            partial_enabled: true,
            time_stop_enabled: true,
            partial_exit_ratio: 0.5,
            partial_target_fraction: 0.5,
            max_holding_hours: 48.0,
        }
    }
}

impl ExitConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.partial_exit_ratio > 0.0 && self.partial_exit_ratio < 1.0) {
            return Err(ConfigurationError::param(
                "partial_exit_ratio",
                format!("{} is outside (0, 1)", self.partial_exit_ratio),
            ));
        }
        if !(self.partial_target_fraction > 0.0 && self.partial_target_fraction < 1.0) {
            return Err(ConfigurationError::param(
                "partial_target_fraction",
                format!("{} is outside (0, 1)", self.partial_target_fraction),
            ));
        }
        if self.time_stop_enabled
            && !(self.max_holding_hours > 0.0 && self.max_holding_hours.is_finite())
        {
            return Err(ConfigurationError::param(
                "max_holding_hours",
                "must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialExit {
    pub ratio: f64,
    pub target_fraction: f64,
}

/// Resolved per-position exit rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitPolicy {
    pub trailing_atr_mult: Option<f64>,
    pub partial: Option<PartialExit>,
    pub max_holding: Option<Duration>,
}

impl ExitPolicy {
    pub fn new(risk: &RiskConfig, exits: &ExitConfig) -> Self {
        Self {
            trailing_atr_mult: exits.trailing_enabled.then_some(risk.trailing_atr_mult),
            partial: exits.partial_enabled.then_some(PartialExit {
                ratio: exits.partial_exit_ratio,
                target_fraction: exits.partial_target_fraction,
            }),
            max_holding: exits
                .time_stop_enabled
                .then(|| Duration::seconds((exits.max_holding_hours * 3600.0).round() as i64)),
        }
    }

    /// Stop-loss and take-profit only.
    pub fn stops_only() -> Self {
        Self {
            trailing_atr_mult: None,
            partial: None,
            max_holding: None,
        }
    }
}

impl Default for ExitPolicy {
    fn default() -> Self {
        Self::new(&RiskConfig::default(), &ExitConfig::default())
    }
}
