//! Bar-by-bar simulation loop.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::cost::CostModel;
use crate::domain::{Bar, BarSequence, EquitySnapshot, OpenPosition, SymbolMeta, TradeProposal};
use crate::error::{ConfigurationError, InputError, SimulationError};
use crate::exit::{ExitPolicy, ExitSignal, ExitStateMachine};
use crate::indicators::StreamingAtr;
use crate::risk::{size, PortfolioGuard, SizingReason};
use crate::rng::{RngHierarchy, SLIPPAGE_STREAM};

use super::ledger::{Ledger, PositionBook};
use super::state::{ExitFault, Rejection, SimulationConfig, SimulationOutcome};

const END_REASON: &str = "simulation end";
const CANCEL_REASON: &str = "simulation cancelled";

type ProposalKey = (DateTime<Utc>, String);

/// Replay `bars`, opening positions from `proposals`.
///
/// Inputs and configuration are validated up front; any problem there is
/// returned as an error before the first bar. After that, per-symbol sizing
/// rejections and exit faults are recorded on the outcome and never abort
/// the run.
///
/// `progress` receives every per-bar snapshot. When `cancel` is set the loop
/// stops before the next bar, force-closes everything and returns a
/// partial outcome with `cancelled = true`.
pub fn run_simulation(
    bars: &BarSequence,
    proposals: &[TradeProposal],
    metas: &HashMap<String, SymbolMeta>,
    config: &SimulationConfig,
    progress: Option<&dyn Fn(&EquitySnapshot)>,
    cancel: Option<&AtomicBool>,
) -> Result<SimulationOutcome, SimulationError> {
    // ─── Setup: fail fast ───
    config.validate()?;
    if bars.is_empty() {
        return Err(InputError::EmptyBars.into());
    }
    let proposals = index_proposals(bars, proposals, metas)?;

    let mut sim = Simulation::new(config, metas);
    info!(
        bars = bars.len(),
        proposals = proposals.len(),
        initial_equity = config.initial_equity,
        "simulation started"
    );

    for step in bars.steps() {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            warn!(bars_processed = sim.bars_processed, "simulation cancelled");
            sim.close_all(CANCEL_REASON);
            return Ok(sim.finish(true));
        }

        // ─── Phase 1: Snapshot ───
        let snapshot = sim.ledger.snapshot(step.timestamp);
        if let Some(cb) = progress {
            cb(&snapshot);
        }

        for (symbol, bar) in step.bars.iter().filter(|(_, b)| b.is_sane()) {
            sim.atr_for(symbol).update(bar);
        }

        // ─── Phase 2: Exits ───
        for symbol in sim.ledger.open_symbols() {
            if let Some(bar) = step.bars.get(&symbol) {
                sim.process_exits(&symbol, bar);
            }
        }

        // ─── Phase 3: Entries ───
        for (symbol, bar) in &step.bars {
            let key = (step.timestamp, symbol.clone());
            if let Some(proposal) = proposals.get(&key) {
                sim.process_entry(proposal, bar);
            }
        }

        // ─── Phase 4: Funding ───
        sim.accrue_funding(step.timestamp);

        sim.bars_processed += 1;
    }

    sim.close_all(END_REASON);
    let outcome = sim.finish(false);
    info!(
        trades = outcome.trades.len(),
        final_equity = outcome.final_equity,
        "simulation finished"
    );
    Ok(outcome)
}

/// Validate proposals and key them by `(timestamp, symbol)`.
fn index_proposals<'a>(
    bars: &BarSequence,
    proposals: &'a [TradeProposal],
    metas: &HashMap<String, SymbolMeta>,
) -> Result<HashMap<ProposalKey, &'a TradeProposal>, SimulationError> {
    for meta in metas.values() {
        meta.validate()?;
    }
    let mut index = HashMap::with_capacity(proposals.len());
    for proposal in proposals {
        proposal.validate()?;
        if !metas.contains_key(&proposal.symbol) {
            return Err(ConfigurationError::MissingSymbolMeta(proposal.symbol.clone()).into());
        }
        if !bars.contains(&proposal.symbol, proposal.timestamp) {
            return Err(InputError::UnmatchedProposal {
                symbol: proposal.symbol.clone(),
                timestamp: proposal.timestamp,
            }
            .into());
        }
        let key = (proposal.timestamp, proposal.symbol.clone());
        if index.insert(key, proposal).is_some() {
            return Err(InputError::DuplicateProposal {
                symbol: proposal.symbol.clone(),
                timestamp: proposal.timestamp,
            }
            .into());
        }
    }
    Ok(index)
}

/// Mutable state of one run. Owned exclusively by the loop.
struct Simulation<'a> {
    config: &'a SimulationConfig,
    metas: &'a HashMap<String, SymbolMeta>,
    ledger: Ledger,
    costs: CostModel,
    guard: PortfolioGuard,
    policy: ExitPolicy,
    rngs: RngHierarchy,
    slippage_rngs: BTreeMap<String, StdRng>,
    atrs: BTreeMap<String, StreamingAtr>,
    rejections: Vec<Rejection>,
    exit_faults: Vec<ExitFault>,
    last_time: Option<DateTime<Utc>>,
    bars_processed: usize,
}

impl<'a> Simulation<'a> {
    fn new(config: &'a SimulationConfig, metas: &'a HashMap<String, SymbolMeta>) -> Self {
        Self {
            config,
            metas,
            ledger: Ledger::new(config.initial_equity),
            costs: CostModel::new(config.costs.clone()),
            guard: PortfolioGuard::from(&config.risk),
            policy: ExitPolicy::new(&config.risk, &config.exits),
            rngs: RngHierarchy::new(config.seed),
            slippage_rngs: BTreeMap::new(),
            atrs: BTreeMap::new(),
            rejections: Vec::new(),
            exit_faults: Vec::new(),
            last_time: None,
            bars_processed: 0,
        }
    }

    fn atr_for(&mut self, symbol: &str) -> &mut StreamingAtr {
        let period = self.config.atr_period;
        self.atrs
            .entry(symbol.to_string())
            .or_insert_with(|| StreamingAtr::new(period))
    }

    fn tick_size(&self, symbol: &str) -> f64 {
        self.metas.get(symbol).map_or(0.0, |m| m.tick_size)
    }

    fn process_exits(&mut self, symbol: &str, bar: &Bar) {
        let streaming_atr = self.atrs.get(symbol).and_then(StreamingAtr::value);
        let Some(book) = self.ledger.book_mut(symbol) else {
            return;
        };
        let atr = streaming_atr.or_else(|| Some(book.position.entry_atr).filter(|a| *a > 0.0));
        let evaluation = book.exits.evaluate(&mut book.position, bar, atr);
        if bar.is_sane() {
            book.position.last_price = bar.close;
        }

        let evaluation = match evaluation {
            Ok(e) => e,
            Err(error) => {
                warn!(symbol, %error, "exit check skipped");
                self.exit_faults.push(ExitFault {
                    symbol: symbol.to_string(),
                    timestamp: bar.timestamp,
                    error: error.to_string(),
                });
                return;
            }
        };

        if let Some(partial) = evaluation.partial {
            self.book_partial(symbol, bar.timestamp, &partial);
        }
        if let Some(close) = evaluation.close {
            self.book_close(symbol, bar.timestamp, &close);
        }
    }

    fn book_partial(&mut self, symbol: &str, timestamp: DateTime<Utc>, signal: &ExitSignal) {
        self.settle_funding(symbol, timestamp);
        let Some(direction) = self.ledger.position(symbol).map(|p| p.direction) else {
            return;
        };
        let tick = self.tick_size(symbol);
        let rng = slippage_rng(&mut self.slippage_rngs, self.rngs, symbol);
        let fill = self
            .costs
            .exit_fill(direction, signal.price, signal.quantity, tick, rng);
        self.ledger.apply_partial(symbol, fill);
    }

    fn book_close(&mut self, symbol: &str, timestamp: DateTime<Utc>, signal: &ExitSignal) {
        self.settle_funding(symbol, timestamp);
        let Some(position) = self.ledger.position(symbol) else {
            return;
        };
        let (direction, quantity) = (position.direction, position.quantity);
        let tick = self.tick_size(symbol);
        let rng = slippage_rng(&mut self.slippage_rngs, self.rngs, symbol);
        let fill = self
            .costs
            .exit_fill(direction, signal.price, quantity, tick, rng);
        self.ledger
            .close(symbol, timestamp, fill, signal.exit_type, &signal.reason);
    }

    fn process_entry(&mut self, proposal: &TradeProposal, bar: &Bar) {
        let symbol = proposal.symbol.as_str();
        if self.ledger.has_position(symbol) {
            debug!(symbol, "proposal ignored, position already open");
            return;
        }
        let metas = self.metas;
        let Some(meta) = metas.get(symbol) else {
            return;
        };
        if !bar.is_sane() {
            self.reject(proposal, vec![SizingReason::InvalidMarketPrice]);
            return;
        }

        let sizing = size(
            self.ledger.equity(),
            proposal.entry,
            proposal.stop,
            proposal.direction,
            proposal.atr,
            proposal.vol_class,
            meta,
            &self.config.risk,
        );
        if !sizing.is_valid {
            self.reject(proposal, sizing.reasons);
            return;
        }
        // Slippage only moves the fill away from the stop, so the close decides.
        if proposal.direction.sign() * (bar.close - proposal.stop) <= 0.0 {
            self.reject(proposal, vec![SizingReason::StopBreachedAtEntry]);
            return;
        }

        let new_risk = sizing.risk_amount(proposal.entry, proposal.stop);
        if let Err(reason) = self.guard.check(
            self.ledger.equity(),
            self.ledger.open_count(),
            self.ledger.open_risk(),
            new_risk,
        ) {
            self.reject(proposal, vec![reason]);
            return;
        }

        let rng = slippage_rng(&mut self.slippage_rngs, self.rngs, symbol);
        let fill = self.costs.entry_fill(
            proposal.direction,
            bar.close,
            sizing.quantity,
            meta.tick_size,
            rng,
        );

        let take_profit = proposal.resolved_take_profit(self.config.risk.risk_reward_ratio);
        let mut position = OpenPosition::new(
            symbol,
            proposal.direction,
            bar.timestamp,
            fill.price,
            fill.quantity,
            proposal.stop,
            take_profit,
            proposal.atr,
        );
        position.leverage = sizing.applied_leverage;
        position.liquidation_price = sizing.liquidation_price;
        position.last_price = bar.close;
        let exits = ExitStateMachine::new(&mut position, self.policy, meta.step_size);
        self.ledger.open(PositionBook { position, exits }, fill);
    }

    fn reject(&mut self, proposal: &TradeProposal, reasons: Vec<SizingReason>) {
        let codes: Vec<&str> = reasons.iter().map(|r| r.as_str()).collect();
        warn!(symbol = %proposal.symbol, reasons = ?codes, "proposal rejected");
        self.rejections.push(Rejection {
            symbol: proposal.symbol.clone(),
            timestamp: proposal.timestamp,
            reasons,
        });
    }

    fn accrue_funding(&mut self, now: DateTime<Utc>) {
        self.last_time = Some(now);
        for symbol in self.ledger.open_symbols() {
            self.settle_funding(&symbol, now);
        }
    }

    /// Charge funding on `symbol` from its last accrual up to `now`.
    fn settle_funding(&mut self, symbol: &str, now: DateTime<Utc>) {
        let Some(position) = self.ledger.position(symbol) else {
            return;
        };
        let hours = (now - position.last_funding_time).num_seconds() as f64 / 3600.0;
        if hours <= 0.0 {
            return;
        }
        let amount = self.costs.funding(position.notional(), hours);
        debug!(symbol, hours, amount, "funding accrued");
        self.ledger.accrue_funding(symbol, now, amount);
    }

    /// Manual-exit every open position at its last seen close.
    fn close_all(&mut self, reason: &str) {
        let Some(now) = self.last_time else {
            return;
        };
        for symbol in self.ledger.open_symbols() {
            let Some(book) = self.ledger.book_mut(&symbol) else {
                continue;
            };
            let price = book.position.last_price;
            let signal = book.exits.manual_exit(&book.position, price, reason);
            self.book_close(&symbol, now, &signal);
        }
    }

    fn finish(self, cancelled: bool) -> SimulationOutcome {
        debug_assert!(
            self.ledger.open_count() > 0
                || (self.ledger.equity() - self.ledger.reconciled_equity()).abs()
                    <= 1e-6 * self.ledger.initial_equity().max(1.0)
        );
        self.ledger.into_outcome(
            self.rejections,
            self.exit_faults,
            self.bars_processed,
            cancelled,
        )
    }
}

fn slippage_rng<'r>(
    rngs: &'r mut BTreeMap<String, StdRng>,
    hierarchy: RngHierarchy,
    symbol: &str,
) -> &'r mut StdRng {
    rngs.entry(symbol.to_string())
        .or_insert_with(|| hierarchy.rng_for(symbol, SLIPPAGE_STREAM))
}
