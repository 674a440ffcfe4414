//! Closed trade record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::direction::Direction;

/// Why a position (or part of it) was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitType {
    StopLoss,
    TakeProfit,
    Partial,
    Trailing,
    Time,
    Manual,
}

impl ExitType {
    /// Partial exits reduce a position without closing it.
    pub fn is_full_close(self) -> bool {
        self != ExitType::Partial
    }
}

/// A completed round trip, aggregating every exit leg of one position.
///
/// `pnl` is the price PnL of all legs at their fill prices (slippage already
/// inside the prices). `net_pnl = pnl - fees - funding`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub direction: Direction,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    /// Quantity-weighted average over all exit legs.
    pub exit_price: f64,
    pub quantity: f64,
    pub pnl: f64,
    pub fees: f64,
    pub funding: f64,
    /// Currency cost of slippage across entry and exits.
    pub slippage: f64,
    pub net_pnl: f64,
    pub exit_type: ExitType,
    pub exit_reason: String,
    /// True if a partial exit happened before the final close.
    pub had_partial: bool,
}

impl Trade {
    /// Returns true if the trade made money after costs.
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }

    pub fn duration(&self) -> Duration {
        self.exit_time - self.entry_time
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration().num_seconds() as f64 / 3600.0
    }

    /// Net PnL relative to entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.quantity;
        if notional <= 0.0 {
            return 0.0;
        }
        self.net_pnl / notional
    }
}
