//! Cost model: slippage, trading fees and funding.
//!
//! - Slippage per unit: `price × min(notional / impact_notional, max_pct) × jitter`,
//!   with jitter uniform in `[1 − j, 1 + j]`, never less than one tick.
//!   Directional: entries pay more, exits receive less.
//! - Fees: maker rate in basis points of fill notional.
//! - Funding: `notional × avg_rate × elapsed_hours / interval_hours`, accrued
//!   bar by bar.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::Direction;
use crate::error::ConfigurationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub slippage_enabled: bool,
    /// Maker fee in basis points per side.
    pub maker_fee_bps: f64,
    /// Notional at which impact reaches 100% before capping.
    pub impact_notional: f64,
    pub max_slippage_pct: f64,
    /// Half-width of the multiplicative jitter band.
    pub slippage_jitter: f64,
    /// Average funding rate per interval.
    pub avg_funding_rate: f64,
    pub funding_interval_hours: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            slippage_enabled: true,
            maker_fee_bps: 2.0,
            impact_notional: 1_000_000.0,
            max_slippage_pct: 0.001,
            slippage_jitter: 0.2,
            avg_funding_rate: 0.0001,
            funding_interval_hours: 8.0,
        }
    }
}

impl CostConfig {
    /// No slippage, fees or funding.
    pub fn frictionless() -> Self {
        Self {
            slippage_enabled: false,
            maker_fee_bps: 0.0,
            avg_funding_rate: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.maker_fee_bps >= 0.0 && self.maker_fee_bps.is_finite()) {
            return Err(ConfigurationError::param("maker_fee_bps", "must be non-negative"));
        }
        if !(self.impact_notional > 0.0) {
            return Err(ConfigurationError::param("impact_notional", "must be positive"));
        }
        if !(0.0..1.0).contains(&self.max_slippage_pct) {
            return Err(ConfigurationError::param("max_slippage_pct", "must be in [0, 1)"));
        }
        if !(0.0..1.0).contains(&self.slippage_jitter) {
            return Err(ConfigurationError::param("slippage_jitter", "must be in [0, 1)"));
        }
        if !self.avg_funding_rate.is_finite() {
            return Err(ConfigurationError::param("avg_funding_rate", "must be finite"));
        }
        if !(self.funding_interval_hours > 0.0) {
            return Err(ConfigurationError::param(
                "funding_interval_hours",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// A priced fill with its friction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub price: f64,
    pub quantity: f64,
    /// Currency cost of slippage.
    pub slippage: f64,
    pub fee: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostModel {
    config: CostConfig,
}

impl CostModel {
    pub fn new(config: CostConfig) -> Self {
        Self { config }
    }

    pub fn frictionless() -> Self {
        Self::new(CostConfig::frictionless())
    }

    pub fn config(&self) -> &CostConfig {
        &self.config
    }

    /// Adverse price move per unit for a fill of `notional`.
    pub fn slippage_per_unit<R: Rng + ?Sized>(
        &self,
        price: f64,
        notional: f64,
        tick_size: f64,
        rng: &mut R,
    ) -> f64 {
        if !self.config.slippage_enabled {
            return 0.0;
        }
        let impact = (notional.abs() / self.config.impact_notional).min(self.config.max_slippage_pct);
        let j = self.config.slippage_jitter;
        let jitter = if j > 0.0 {
            rng.gen_range(1.0 - j..=1.0 + j)
        } else {
            1.0
        };
        (price * impact * jitter).max(tick_size)
    }

    /// Fee for a fill of `notional`.
    pub fn fee(&self, notional: f64) -> f64 {
        notional.abs() * self.config.maker_fee_bps / 10_000.0
    }

    /// Funding owed on `notional` held for `elapsed_hours`.
    pub fn funding(&self, notional: f64, elapsed_hours: f64) -> f64 {
        if elapsed_hours <= 0.0 {
            return 0.0;
        }
        notional.abs() * self.config.avg_funding_rate * elapsed_hours
            / self.config.funding_interval_hours
    }

    /// Price an entry at `reference`.
    pub fn entry_fill<R: Rng + ?Sized>(
        &self,
        direction: Direction,
        reference: f64,
        quantity: f64,
        tick_size: f64,
        rng: &mut R,
    ) -> Fill {
        let slip = self.slippage_per_unit(reference, reference * quantity, tick_size, rng);
        let price = direction.adverse_entry(reference, slip);
        self.fill(price, quantity, slip)
    }

    /// Price an exit at `reference`.
    pub fn exit_fill<R: Rng + ?Sized>(
        &self,
        direction: Direction,
        reference: f64,
        quantity: f64,
        tick_size: f64,
        rng: &mut R,
    ) -> Fill {
        let slip = self.slippage_per_unit(reference, reference * quantity, tick_size, rng);
        // A short exit can always pay more; a long exit cannot sell below zero.
        let price = direction.adverse_exit(reference, slip).max(tick_size);
        let slip = (price - reference).abs();
        self.fill(price, quantity, slip)
    }

    fn fill(&self, price: f64, quantity: f64, slip_per_unit: f64) -> Fill {
        Fill {
            price,
            quantity,
            slippage: slip_per_unit * quantity,
            fee: self.fee(price * quantity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RngHierarchy;

    #[test]
    fn frictionless_fills_at_reference() {
        let cost = CostModel::frictionless();
        let mut rng = RngHierarchy::new(1).rng_for("BTCUSDT", 0);
        let fill = cost.entry_fill(Direction::Long, 100.0, 5.0, 0.01, &mut rng);
        assert_eq!(fill.price, 100.0);
        assert_eq!(fill.slippage, 0.0);
        assert_eq!(fill.fee, 0.0);
        assert_eq!(cost.funding(10_000.0, 8.0), 0.0);
    }

    #[test]
    fn slippage_is_adverse_both_ways() {
        let cost = CostModel::default();
        let mut rng = RngHierarchy::new(1).rng_for("BTCUSDT", 0);
        let long_in = cost.entry_fill(Direction::Long, 100.0, 1_000.0, 0.01, &mut rng);
        assert!(long_in.price > 100.0);
        let long_out = cost.exit_fill(Direction::Long, 100.0, 1_000.0, 0.01, &mut rng);
        assert!(long_out.price < 100.0);
        let short_in = cost.entry_fill(Direction::Short, 100.0, 1_000.0, 0.01, &mut rng);
        assert!(short_in.price < 100.0);
        let short_out = cost.exit_fill(Direction::Short, 100.0, 1_000.0, 0.01, &mut rng);
        assert!(short_out.price > 100.0);
    }

    #[test]
    fn slippage_bounded_and_floored() {
        let cost = CostModel::default();
        let mut rng = RngHierarchy::new(9).rng_for("ETHUSDT", 0);
        for _ in 0..200 {
            // Huge notional: capped at 0.1% × 1.2 jitter.
            let s = cost.slippage_per_unit(100.0, 1e9, 0.01, &mut rng);
            assert!(s >= 100.0 * 0.001 * 0.8 - 1e-12);
            assert!(s <= 100.0 * 0.001 * 1.2 + 1e-12);
            // Tiny notional: one tick.
            let s = cost.slippage_per_unit(100.0, 10.0, 0.01, &mut rng);
            assert_eq!(s, 0.01);
        }
    }

    #[test]
    fn slippage_grows_with_notional() {
        let cfg = CostConfig {
            slippage_jitter: 0.0,
            ..CostConfig::default()
        };
        let cost = CostModel::new(cfg);
        let mut rng = RngHierarchy::new(1).rng_for("BTCUSDT", 0);
        let small = cost.slippage_per_unit(100.0, 100.0, 0.0001, &mut rng);
        let large = cost.slippage_per_unit(100.0, 500.0, 0.0001, &mut rng);
        assert!((small - 0.01).abs() < 1e-12);
        assert!((large - 0.05).abs() < 1e-12);
    }

    #[test]
    fn maker_fee_in_bps() {
        let cost = CostModel::default();
        assert!((cost.fee(10_000.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn funding_pro_rata() {
        let cost = CostModel::default();
        // One full interval: 10k × 0.01%.
        assert!((cost.funding(10_000.0, 8.0) - 1.0).abs() < 1e-12);
        assert!((cost.funding(10_000.0, 2.0) - 0.25).abs() < 1e-12);
        assert_eq!(cost.funding(10_000.0, 0.0), 0.0);
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let cfg = CostConfig {
            funding_interval_hours: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        assert!(CostConfig::default().validate().is_ok());
    }
}
