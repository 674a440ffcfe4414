//! Risk-bounded position sizer.
//!
//! # Formula
//! ```text
//! risk_budget       = equity × risk_per_trade
//! notional          = risk_budget / (|entry − stop| / entry)
//! effective_lev     = notional / equity, capped at min(class cap, exchange max)
//! applied_lev       = clamp(floor(effective_lev), 1, cap)
//! quantity          = floor(notional / entry / step) × step
//! ```
//!
//! If the liquidation buffer fails at `applied_lev`, leverage is halved until
//! it passes or reaches 1. At leverage 1 the notional is halved and checked
//! one last time.

use serde::{Deserialize, Serialize};

use super::config::RiskConfig;
use super::liquidation::LiquidationBuffer;
use super::reason::SizingReason;
use crate::domain::{Direction, SymbolMeta, VolClass};

/// Sizer output. Always returned, valid or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingResult {
    pub notional: f64,
    pub quantity: f64,
    pub effective_leverage: f64,
    pub applied_leverage: u32,
    pub liquidation_price: f64,
    pub is_valid: bool,
    pub reasons: Vec<SizingReason>,
    /// Number of liquidation validator calls.
    pub validation_attempts: u32,
    /// Leverage halvings plus the final notional cut, if any.
    pub deleverage_steps: u32,
}

impl SizingResult {
    fn rejected(reason: SizingReason) -> Self {
        Self {
            notional: 0.0,
            quantity: 0.0,
            effective_leverage: 0.0,
            applied_leverage: 0,
            liquidation_price: 0.0,
            is_valid: false,
            reasons: vec![reason],
            validation_attempts: 0,
            deleverage_steps: 0,
        }
    }

    /// Loss at the stop for the sized quantity.
    pub fn risk_amount(&self, entry: f64, stop: f64) -> f64 {
        (entry - stop).abs() * self.quantity
    }
}

/// Size a position. Pure and deterministic.
#[allow(clippy::too_many_arguments)]
pub fn size(
    equity: f64,
    entry: f64,
    stop: f64,
    direction: Direction,
    atr: f64,
    vol_class: VolClass,
    meta: &SymbolMeta,
    config: &RiskConfig,
) -> SizingResult {
    if !(equity > 0.0 && equity.is_finite()) {
        return SizingResult::rejected(SizingReason::NonPositiveEquity);
    }
    let stop_distance = (entry - stop).abs();
    if !(entry > 0.0 && stop_distance > 0.0 && stop_distance.is_finite()) {
        return SizingResult::rejected(SizingReason::InvalidStopDistance);
    }

    let risk_budget = equity * config.risk_per_trade;
    let mut notional = risk_budget / (stop_distance / entry);

    let max_leverage = config
        .leverage_caps
        .cap_for(vol_class)
        .map_or(meta.max_leverage, |cap| cap.min(meta.max_leverage))
        .max(1);
    let cap = f64::from(max_leverage);
    if notional / equity > cap {
        notional = equity * cap;
    }

    let mut leverage = ((notional / equity).floor() as u32).clamp(1, max_leverage);

    let buffer = LiquidationBuffer::from(config);
    let validate = |lev: u32| buffer.validate(direction, entry, stop, atr, lev, &meta.margin_tiers);

    let mut check = validate(leverage);
    let mut attempts = 1;
    let mut steps = 0;
    while !check.passes && leverage > 1 {
        leverage = (leverage / 2).max(1);
        steps += 1;
        attempts += 1;
        check = validate(leverage);
    }
    if !check.passes {
        notional *= 0.5;
        steps += 1;
        attempts += 1;
        check = validate(leverage);
    }

    let mut result = SizingResult {
        notional,
        quantity: 0.0,
        effective_leverage: notional / equity,
        applied_leverage: leverage,
        liquidation_price: check.liquidation_price,
        is_valid: false,
        reasons: Vec::new(),
        validation_attempts: attempts,
        deleverage_steps: steps,
    };

    if !check.passes {
        result.reasons = check.reasons;
        result.reasons.push(SizingReason::LiquidationBufferUnreachable);
        return result;
    }

    result.quantity = meta.floor_to_step(notional / entry);
    if result.quantity <= 0.0 {
        result.quantity = 0.0;
        result.reasons.push(SizingReason::QtyRoundsToZero);
        return result;
    }
    if result.quantity * entry < meta.min_notional {
        result.reasons.push(SizingReason::BelowMinNotional);
        return result;
    }

    result.is_valid = true;
    result.reasons.push(SizingReason::Ok);
    result
}
