//! Exchange contract metadata.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// One maintenance-margin bracket of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginTier {
    pub notional_floor: f64,
    pub notional_cap: f64,
    pub maint_margin_rate: f64,
}

impl MarginTier {
    /// Margin rate of the tier with the lowest notional floor, or the default
    /// rate when no tiers are published.
    pub fn base_rate(tiers: &[MarginTier]) -> f64 {
        tiers
            .iter()
            .min_by(|a, b| a.notional_floor.total_cmp(&b.notional_floor))
            .map(|t| t.maint_margin_rate)
            .unwrap_or(SymbolMeta::DEFAULT_MAINT_MARGIN_RATE)
    }
}

/// Volatility classification of a contract; each class carries its own
/// leverage cap in the risk configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolClass {
    /// Large, liquid contracts (BTC, ETH).
    Core,
    /// Established large caps.
    Major,
    /// Everything else.
    Alt,
    /// No class cap; only the exchange maximum applies.
    #[default]
    Unclassified,
}

/// Immutable, externally supplied contract metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMeta {
    pub symbol: String,
    pub tick_size: f64,
    pub step_size: f64,
    #[serde(default)]
    pub min_notional: f64,
    pub max_leverage: u32,
    #[serde(default)]
    pub margin_tiers: Vec<MarginTier>,
}

impl SymbolMeta {
    /// Maintenance margin rate used when a contract publishes no tiers.
    pub const DEFAULT_MAINT_MARGIN_RATE: f64 = 0.004;

    /// Margin rate of the tier with the lowest notional floor.
    ///
    /// Liquidation prices are approximated with this rate regardless of the
    /// position's actual notional.
    pub fn base_maint_margin_rate(&self) -> f64 {
        MarginTier::base_rate(&self.margin_tiers)
    }

    /// Round a quantity down to a whole number of steps.
    pub fn floor_to_step(&self, quantity: f64) -> f64 {
        floor_to_step(quantity, self.step_size)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |reason: &str| ConfigurationError::InvalidSymbolMeta {
            symbol: self.symbol.clone(),
            reason: reason.to_string(),
        };
        if !(self.tick_size > 0.0 && self.tick_size.is_finite()) {
            return Err(invalid("tick size must be positive"));
        }
        if !(self.step_size > 0.0 && self.step_size.is_finite()) {
            return Err(invalid("step size must be positive"));
        }
        if self.min_notional < 0.0 || !self.min_notional.is_finite() {
            return Err(invalid("min notional must be non-negative"));
        }
        if self.max_leverage < 1 {
            return Err(invalid("max leverage must be at least 1"));
        }
        if self
            .margin_tiers
            .iter()
            .any(|t| !(0.0..1.0).contains(&t.maint_margin_rate))
        {
            return Err(invalid("maintenance margin rate must be in [0, 1)"));
        }
        Ok(())
    }
}

/// Round `quantity` down to a whole number of `step`s. Zero for
/// non-positive inputs.
pub fn floor_to_step(quantity: f64, step: f64) -> f64 {
    if quantity <= 0.0 || step <= 0.0 {
        return 0.0;
    }
    // Absorb representation error so exact multiples are not lost.
    (quantity / step + 1e-9).floor() * step
}
