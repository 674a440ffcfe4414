//! Liquidation buffer validation.
//!
//! The liquidation price is an approximation from the lowest maintenance
//! margin tier:
//!
//! ```text
//! long:  entry × (1 − 1/leverage) × (1 − mmr)
//! short: entry × (1 + 1/leverage) × (1 + mmr)
//! ```
//!
//! A size passes when both distances clear their buffers:
//!
//! ```text
//! |entry − liq| / entry ≥ max(Z × ATR / entry, min_pct)
//! |stop  − liq| / stop  ≥ Y × ATR / stop
//! ```

use serde::{Deserialize, Serialize};

use super::config::RiskConfig;
use super::reason::SizingReason;
use crate::domain::{Direction, MarginTier};

/// Approximate liquidation price at an integer leverage.
pub fn liquidation_price(direction: Direction, entry: f64, leverage: u32, mmr: f64) -> f64 {
    let inv = 1.0 / f64::from(leverage.max(1));
    match direction {
        Direction::Long => entry * (1.0 - inv) * (1.0 - mmr),
        Direction::Short => entry * (1.0 + inv) * (1.0 + mmr),
    }
}

/// Result of one validator call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationCheck {
    pub passes: bool,
    pub liquidation_price: f64,
    /// `[Ok]` on success, otherwise the failed buffers in check order.
    pub reasons: Vec<SizingReason>,
}

/// Buffer thresholds taken from [`RiskConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidationBuffer {
    pub min_pct: f64,
    pub entry_atr_mult: f64,
    pub stop_atr_mult: f64,
}

impl Default for LiquidationBuffer {
    fn default() -> Self {
        Self::from(&RiskConfig::default())
    }
}

impl From<&RiskConfig> for LiquidationBuffer {
    fn from(config: &RiskConfig) -> Self {
        Self {
            min_pct: config.liq_buffer_min_pct,
            entry_atr_mult: config.entry_buffer_atr_mult,
            stop_atr_mult: config.sl_buffer_atr_mult,
        }
    }
}

impl LiquidationBuffer {
    pub fn validate(
        &self,
        direction: Direction,
        entry: f64,
        stop: f64,
        atr: f64,
        leverage: u32,
        tiers: &[MarginTier],
    ) -> LiquidationCheck {
        let mmr = MarginTier::base_rate(tiers);
        let liq = liquidation_price(direction, entry, leverage, mmr);
        let sign = direction.sign();

        let entry_distance = sign * (entry - liq) / entry;
        let stop_distance = sign * (stop - liq) / stop;

        let entry_required = (self.entry_atr_mult * atr / entry).max(self.min_pct);
        let stop_required = self.stop_atr_mult * atr / stop;

        let mut reasons = Vec::new();
        if entry_distance < entry_required {
            reasons.push(SizingReason::EntryLiqBufferFail);
        }
        if stop_distance < stop_required {
            reasons.push(SizingReason::SlLiqBufferFail);
        }

        let passes = reasons.is_empty();
        if passes {
            reasons.push(SizingReason::Ok);
        }
        LiquidationCheck {
            passes,
            liquidation_price: liq,
            reasons,
        }
    }
}
