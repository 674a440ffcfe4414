//! Trade proposals produced by an upstream signal layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::direction::Direction;
use super::symbol::VolClass;
use crate::error::InputError;

/// A trade idea for one symbol at one bar. Consumed at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeProposal {
    pub symbol: String,
    /// Timestamp of the bar this proposal is evaluated on.
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub entry: f64,
    pub stop: f64,
    pub atr: f64,
    /// Signal strength in [0, 1]; informational.
    #[serde(default)]
    pub strength: f64,
    /// Explicit take-profit. Derived from the reward/risk ratio when absent.
    #[serde(default)]
    pub take_profit: Option<f64>,
    #[serde(default)]
    pub vol_class: VolClass,
}

impl TradeProposal {
    /// Build a proposal whose stop sits `stop_atr_mult` ATRs behind entry.
    pub fn with_atr_stop(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        direction: Direction,
        entry: f64,
        atr: f64,
        stop_atr_mult: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            direction,
            entry,
            stop: entry - direction.sign() * stop_atr_mult * atr,
            atr,
            strength: 1.0,
            take_profit: None,
            vol_class: VolClass::default(),
        }
    }

    /// The explicit take-profit, or `entry ± reward_risk × |entry − stop|`.
    pub fn resolved_take_profit(&self, reward_risk: f64) -> f64 {
        self.take_profit.unwrap_or_else(|| {
            let distance = (self.entry - self.stop).abs();
            self.entry + self.direction.sign() * reward_risk * distance
        })
    }

    /// Structural checks. A stop equal to entry passes here and is left for
    /// the sizer to reject.
    pub fn validate(&self) -> Result<(), InputError> {
        let malformed = |reason: &str| InputError::MalformedProposal {
            symbol: self.symbol.clone(),
            timestamp: self.timestamp,
            reason: reason.to_string(),
        };
        if !(self.entry.is_finite() && self.entry > 0.0) {
            return Err(malformed("entry must be positive"));
        }
        if !(self.stop.is_finite() && self.stop > 0.0) {
            return Err(malformed("stop must be positive"));
        }
        if !(self.atr.is_finite() && self.atr >= 0.0) {
            return Err(malformed("atr must be non-negative"));
        }
        let stop_offset = self.direction.sign() * (self.entry - self.stop);
        if stop_offset < 0.0 {
            return Err(malformed("stop is on the profit side of entry"));
        }
        if let Some(tp) = self.take_profit {
            if !tp.is_finite() || self.direction.sign() * (tp - self.entry) <= 0.0 {
                return Err(malformed("take-profit is not on the profit side of entry"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn atr_stop_sits_behind_entry() {
        let long = TradeProposal::with_atr_stop("BTCUSDT", ts(), Direction::Long, 100.0, 2.0, 2.0);
        assert_eq!(long.stop, 96.0);
        let short = TradeProposal::with_atr_stop("BTCUSDT", ts(), Direction::Short, 100.0, 2.0, 2.0);
        assert_eq!(short.stop, 104.0);
    }

    #[test]
    fn take_profit_derived_from_reward_risk() {
        let p = TradeProposal::with_atr_stop("BTCUSDT", ts(), Direction::Long, 100.0, 2.5, 2.0);
        assert!((p.resolved_take_profit(1.5) - 107.5).abs() < 1e-12);

        let mut s = TradeProposal::with_atr_stop("BTCUSDT", ts(), Direction::Short, 100.0, 2.5, 2.0);
        assert!((s.resolved_take_profit(1.5) - 92.5).abs() < 1e-12);
        s.take_profit = Some(90.0);
        assert_eq!(s.resolved_take_profit(1.5), 90.0);
    }

    #[test]
    fn validate_rejects_wrong_side_stop() {
        let mut p = TradeProposal::with_atr_stop("BTCUSDT", ts(), Direction::Long, 100.0, 2.0, 2.0);
        assert!(p.validate().is_ok());
        p.stop = 105.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn validate_rejects_wrong_side_take_profit() {
        let mut p = TradeProposal::with_atr_stop("BTCUSDT", ts(), Direction::Short, 100.0, 2.0, 2.0);
        p.take_profit = Some(101.0);
        assert!(p.validate().is_err());
    }

    #[test]
    fn validate_passes_stop_equal_to_entry() {
        let mut p = TradeProposal::with_atr_stop("BTCUSDT", ts(), Direction::Long, 100.0, 2.0, 2.0);
        p.stop = 100.0;
        assert!(p.validate().is_ok());
    }
}
