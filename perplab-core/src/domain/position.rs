//! Open position state, owned by the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::direction::Direction;
use super::trade::{ExitType, Trade};

/// A live position on one symbol.
///
/// Price PnL, fees, slippage and funding of every leg accumulate here until
/// the final close folds them into a single [`Trade`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub symbol: String,
    pub direction: Direction,
    pub entry_time: DateTime<Utc>,
    /// Fill price, slippage included.
    pub entry_price: f64,
    /// Remaining quantity.
    pub quantity: f64,
    pub initial_quantity: f64,
    pub stop_price: f64,
    pub take_profit: f64,
    pub entry_atr: f64,
    pub leverage: u32,
    pub liquidation_price: f64,
    pub fees: f64,
    pub slippage: f64,
    pub funding: f64,
    /// Price PnL realized by partial exits.
    pub realized_pnl: f64,
    /// Σ exit price × quantity over partial exits.
    exited_value: f64,
    pub trailing_stop: Option<f64>,
    pub partial_exit_done: bool,
    pub last_funding_time: DateTime<Utc>,
    /// Last close seen for this symbol.
    pub last_price: f64,
}

impl OpenPosition {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        direction: Direction,
        entry_time: DateTime<Utc>,
        entry_price: f64,
        quantity: f64,
        stop_price: f64,
        take_profit: f64,
        entry_atr: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            direction,
            entry_time,
            entry_price,
            quantity,
            initial_quantity: quantity,
            stop_price,
            take_profit,
            entry_atr,
            leverage: 1,
            liquidation_price: 0.0,
            fees: 0.0,
            slippage: 0.0,
            funding: 0.0,
            realized_pnl: 0.0,
            exited_value: 0.0,
            trailing_stop: None,
            partial_exit_done: false,
            last_funding_time: entry_time,
            last_price: entry_price,
        }
    }

    /// Entry notional of the remaining quantity.
    pub fn notional(&self) -> f64 {
        self.entry_price * self.quantity
    }

    /// Loss if the current stop is hit, ignoring costs.
    pub fn open_risk(&self) -> f64 {
        (-self.direction.pnl(self.entry_price, self.stop_price, self.quantity)).max(0.0)
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.direction.pnl(self.entry_price, price, self.quantity)
    }

    /// Book a partial exit leg. Returns its price PnL.
    pub fn record_partial(&mut self, price: f64, quantity: f64, fee: f64, slippage: f64) -> f64 {
        let pnl = self.direction.pnl(self.entry_price, price, quantity);
        self.quantity -= quantity;
        self.realized_pnl += pnl;
        self.exited_value += price * quantity;
        self.fees += fee;
        self.slippage += slippage;
        self.partial_exit_done = true;
        pnl
    }

    /// Close the remaining quantity and fold every leg into a trade.
    ///
    /// Returns the trade and the price PnL of this final leg.
    pub fn close(
        mut self,
        exit_time: DateTime<Utc>,
        price: f64,
        fee: f64,
        slippage: f64,
        exit_type: ExitType,
        reason: impl Into<String>,
    ) -> (Trade, f64) {
        let quantity = self.quantity;
        let leg_pnl = self.direction.pnl(self.entry_price, price, quantity);
        self.realized_pnl += leg_pnl;
        self.exited_value += price * quantity;
        self.fees += fee;
        self.slippage += slippage;

        let exit_price = if self.initial_quantity > 0.0 {
            self.exited_value / self.initial_quantity
        } else {
            price
        };
        let trade = Trade {
            symbol: self.symbol,
            direction: self.direction,
            entry_time: self.entry_time,
            exit_time,
            entry_price: self.entry_price,
            exit_price,
            quantity: self.initial_quantity,
            pnl: self.realized_pnl,
            fees: self.fees,
            funding: self.funding,
            slippage: self.slippage,
            net_pnl: self.realized_pnl - self.fees - self.funding,
            exit_type,
            exit_reason: reason.into(),
            had_partial: self.partial_exit_done,
        };
        (trade, leg_pnl)
    }
}
