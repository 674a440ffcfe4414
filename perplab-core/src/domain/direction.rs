//! Position direction.

use serde::{Deserialize, Serialize};

/// Long or short exposure on a perpetual contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn is_long(self) -> bool {
        self == Direction::Long
    }

    /// Price PnL of moving `quantity` from `entry` to `exit`.
    ///
    /// Long: `(exit - entry) * qty`. Short: `(entry - exit) * qty`.
    pub fn pnl(self, entry: f64, exit: f64, quantity: f64) -> f64 {
        self.sign() * (exit - entry) * quantity
    }

    /// Shift `price` against this position by `amount` (buy higher on a long
    /// entry, sell lower on a short entry).
    pub fn adverse_entry(self, price: f64, amount: f64) -> f64 {
        price + self.sign() * amount
    }

    /// Shift `price` against this position when closing it.
    pub fn adverse_exit(self, price: f64, amount: f64) -> f64 {
        price - self.sign() * amount
    }
}
