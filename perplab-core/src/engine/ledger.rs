//! Ledger: equity, open positions and trade history for one run.
//!
//! Equity is realized: price PnL, fees and funding hit it when they occur,
//! not when a position is marked. Once flat,
//! `equity = initial + Σ pnl − Σ fees − Σ funding` over the trade list.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::cost::Fill;
use crate::domain::{EquitySnapshot, ExitType, OpenPosition, Trade};
use crate::exit::ExitStateMachine;

use super::state::{ExitFault, Rejection, SimulationOutcome};

/// An open position together with its exit state machine.
#[derive(Debug, Clone)]
pub struct PositionBook {
    pub position: OpenPosition,
    pub exits: ExitStateMachine,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    initial_equity: f64,
    equity: f64,
    positions: BTreeMap<String, PositionBook>,
    trades: Vec<Trade>,
    snapshots: Vec<EquitySnapshot>,
    total_fees: f64,
    total_funding: f64,
    total_slippage: f64,
}

impl Ledger {
    pub fn new(initial_equity: f64) -> Self {
        Self {
            initial_equity,
            equity: initial_equity,
            positions: BTreeMap::new(),
            trades: Vec::new(),
            snapshots: Vec::new(),
            total_fees: 0.0,
            total_funding: 0.0,
            total_slippage: 0.0,
        }
    }

    pub fn initial_equity(&self) -> f64 {
        self.initial_equity
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn position(&self, symbol: &str) -> Option<&OpenPosition> {
        self.positions.get(symbol).map(|b| &b.position)
    }

    pub(crate) fn book_mut(&mut self, symbol: &str) -> Option<&mut PositionBook> {
        self.positions.get_mut(symbol)
    }

    /// Open symbols in lexical order.
    pub fn open_symbols(&self) -> Vec<String> {
        self.positions.keys().cloned().collect()
    }

    /// Σ loss-at-stop over open positions.
    pub fn open_risk(&self) -> f64 {
        self.positions.values().map(|b| b.position.open_risk()).sum()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn snapshots(&self) -> &[EquitySnapshot] {
        &self.snapshots
    }

    pub fn total_fees(&self) -> f64 {
        self.total_fees
    }

    pub fn total_funding(&self) -> f64 {
        self.total_funding
    }

    pub fn total_slippage(&self) -> f64 {
        self.total_slippage
    }

    /// Append a snapshot of current equity.
    pub fn snapshot(&mut self, timestamp: DateTime<Utc>) -> EquitySnapshot {
        let snapshot = EquitySnapshot {
            timestamp,
            equity: self.equity,
            open_positions: self.positions.len(),
        };
        self.snapshots.push(snapshot);
        snapshot
    }

    /// Register a filled entry. The entry fee is charged immediately.
    ///
    /// Returns `false` (and changes nothing) if the symbol is already open.
    pub fn open(&mut self, mut book: PositionBook, entry: Fill) -> bool {
        let symbol = book.position.symbol.clone();
        if self.positions.contains_key(&symbol) {
            return false;
        }
        book.position.fees += entry.fee;
        book.position.slippage += entry.slippage;
        self.equity -= entry.fee;
        self.total_fees += entry.fee;
        self.total_slippage += entry.slippage;
        info!(
            symbol = %symbol,
            direction = ?book.position.direction,
            price = entry.price,
            quantity = entry.quantity,
            leverage = book.position.leverage,
            "position opened"
        );
        self.positions.insert(symbol, book);
        true
    }

    /// Book a partial exit; the remainder stays open.
    pub fn apply_partial(&mut self, symbol: &str, fill: Fill) -> Option<f64> {
        let book = self.positions.get_mut(symbol)?;
        let pnl = book
            .position
            .record_partial(fill.price, fill.quantity, fill.fee, fill.slippage);
        self.equity += pnl - fill.fee;
        self.total_fees += fill.fee;
        self.total_slippage += fill.slippage;
        debug!(symbol, price = fill.price, quantity = fill.quantity, pnl, "partial exit");
        Some(pnl)
    }

    /// Close the remaining quantity and append the trade.
    pub fn close(
        &mut self,
        symbol: &str,
        exit_time: DateTime<Utc>,
        fill: Fill,
        exit_type: ExitType,
        reason: &str,
    ) -> Option<&Trade> {
        let book = self.positions.remove(symbol)?;
        let (trade, leg_pnl) =
            book.position
                .close(exit_time, fill.price, fill.fee, fill.slippage, exit_type, reason);
        self.equity += leg_pnl - fill.fee;
        self.total_fees += fill.fee;
        self.total_slippage += fill.slippage;
        info!(
            symbol,
            exit_type = ?exit_type,
            price = fill.price,
            net_pnl = trade.net_pnl,
            reason,
            "position closed"
        );
        self.trades.push(trade);
        self.trades.last()
    }

    /// Charge funding on `symbol` up to `now`.
    pub fn accrue_funding(&mut self, symbol: &str, now: DateTime<Utc>, amount: f64) {
        if let Some(book) = self.positions.get_mut(symbol) {
            book.position.funding += amount;
            book.position.last_funding_time = now;
            self.equity -= amount;
            self.total_funding += amount;
        }
    }

    /// Σ pnl − fees − funding over closed trades, plus initial equity.
    pub fn reconciled_equity(&self) -> f64 {
        self.initial_equity
            + self
                .trades
                .iter()
                .map(|t| t.pnl - t.fees - t.funding)
                .sum::<f64>()
    }

    pub(crate) fn into_outcome(
        self,
        rejections: Vec<Rejection>,
        exit_faults: Vec<ExitFault>,
        bars_processed: usize,
        cancelled: bool,
    ) -> SimulationOutcome {
        SimulationOutcome {
            initial_equity: self.initial_equity,
            final_equity: self.equity,
            trades: self.trades,
            equity_curve: self.snapshots,
            total_fees: self.total_fees,
            total_funding: self.total_funding,
            total_slippage: self.total_slippage,
            rejections,
            exit_faults,
            bars_processed,
            cancelled,
        }
    }
}
