//! Per-position exit state machine.

use serde::{Deserialize, Serialize};

use super::policy::ExitPolicy;
use super::ratchet::RatchetState;
use super::signal::{ExitError, ExitEvaluation, ExitSignal};
use crate::domain::{floor_to_step, Bar, Direction, ExitType, OpenPosition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitState {
    Open,
    PartiallyClosed,
    Closed,
}

/// Tracks one position from entry to its final close.
///
/// Mutates only the position's stop (break-even after a partial), its
/// trailing level and its partial flag. Quantities and costs are left to
/// the ledger.
#[derive(Debug, Clone)]
pub struct ExitStateMachine {
    state: ExitState,
    policy: ExitPolicy,
    trail: Option<RatchetState>,
    step_size: f64,
}

impl ExitStateMachine {
    /// Seed a machine for a freshly opened position. The trail starts at the
    /// initial stop.
    pub fn new(position: &mut OpenPosition, policy: ExitPolicy, step_size: f64) -> Self {
        let trail = policy
            .trailing_atr_mult
            .map(|_| RatchetState::with_initial_level(position.direction, position.stop_price));
        position.trailing_stop = trail.map(|t| t.level());
        Self {
            state: ExitState::Open,
            policy,
            trail,
            step_size,
        }
    }

    pub fn state(&self) -> ExitState {
        self.state
    }

    pub fn trailing_level(&self) -> Option<f64> {
        self.trail.map(|t| t.level())
    }

    /// Run the priority-ordered checks for one bar.
    ///
    /// `atr` is the current volatility estimate; `None` skips the trailing
    /// update for this bar.
    pub fn evaluate(
        &mut self,
        position: &mut OpenPosition,
        bar: &Bar,
        atr: Option<f64>,
    ) -> Result<ExitEvaluation, ExitError> {
        if self.state == ExitState::Closed {
            return Ok(ExitEvaluation::default());
        }
        if bar.is_void() {
            return Err(ExitError::MissingPrice {
                symbol: position.symbol.clone(),
            });
        }
        if !bar.is_sane() {
            return Err(ExitError::InvalidPrice {
                symbol: position.symbol.clone(),
            });
        }
        if let Some(a) = atr {
            if !(a.is_finite() && a >= 0.0) {
                return Err(ExitError::InvalidAtr {
                    symbol: position.symbol.clone(),
                    atr: a,
                });
            }
        }

        let direction = position.direction;
        let mut evaluation = ExitEvaluation::default();

        // 1. Stop-loss
        if adverse_touch(direction, bar, position.stop_price) {
            let price = adverse_fill(direction, bar.open, position.stop_price);
            evaluation.close =
                Some(self.full_close(position, ExitType::StopLoss, price, "stop-loss hit"));
            return Ok(evaluation);
        }

        // 2. Take-profit
        if favorable_touch(direction, bar, position.take_profit) {
            let price = favorable_fill(direction, bar.open, position.take_profit);
            evaluation.close =
                Some(self.full_close(position, ExitType::TakeProfit, price, "take-profit hit"));
            return Ok(evaluation);
        }

        // 3. Partial target
        let mut remaining = position.quantity;
        if let Some(partial) = self.policy.partial.filter(|_| !position.partial_exit_done) {
            let target = position.entry_price
                + partial.target_fraction * (position.take_profit - position.entry_price);
            if favorable_touch(direction, bar, target) {
                let quantity = floor_to_step(partial.ratio * position.quantity, self.step_size);
                if quantity > 0.0 && quantity < position.quantity {
                    let price = favorable_fill(direction, bar.open, target);
                    evaluation.partial = Some(ExitSignal {
                        exit_type: ExitType::Partial,
                        price,
                        quantity,
                        reason: "partial target reached".into(),
                        pnl: direction.pnl(position.entry_price, price, quantity),
                    });
                    remaining -= quantity;
                    position.stop_price = position.entry_price;
                    self.state = ExitState::PartiallyClosed;
                }
                // Fires at most once, even when the slice rounds away.
                position.partial_exit_done = true;
            }
        }

        // 4. Trailing stop
        if let (Some(level), Some(mult)) = (self.trailing_level(), self.policy.trailing_atr_mult) {
            if adverse_touch(direction, bar, level) {
                let price = adverse_fill(direction, bar.open, level);
                evaluation.close = Some(self.close_quantity(
                    position,
                    remaining,
                    ExitType::Trailing,
                    price,
                    "trailing stop hit",
                ));
                return Ok(evaluation);
            }
            if let (Some(a), Some(trail)) = (atr, self.trail.as_mut()) {
                let candidate = bar.close - direction.sign() * mult * a;
                position.trailing_stop = Some(trail.apply(candidate));
            }
        }

        // 5. Time stop
        if let Some(max_holding) = self.policy.max_holding {
            if bar.timestamp - position.entry_time >= max_holding {
                evaluation.close = Some(self.close_quantity(
                    position,
                    remaining,
                    ExitType::Time,
                    bar.close,
                    "time-based exit",
                ));
            }
        }

        Ok(evaluation)
    }

    /// Forced close of the whole remaining quantity.
    pub fn manual_exit(
        &mut self,
        position: &OpenPosition,
        price: f64,
        reason: impl Into<String>,
    ) -> ExitSignal {
        self.close_quantity(position, position.quantity, ExitType::Manual, price, reason)
    }

    fn full_close(
        &mut self,
        position: &OpenPosition,
        exit_type: ExitType,
        price: f64,
        reason: &str,
    ) -> ExitSignal {
        self.close_quantity(position, position.quantity, exit_type, price, reason)
    }

    fn close_quantity(
        &mut self,
        position: &OpenPosition,
        quantity: f64,
        exit_type: ExitType,
        price: f64,
        reason: impl Into<String>,
    ) -> ExitSignal {
        self.state = ExitState::Closed;
        ExitSignal {
            exit_type,
            price,
            quantity,
            reason: reason.into(),
            pnl: position.direction.pnl(position.entry_price, price, quantity),
        }
    }
}

/// Bar trades through `level` against the position.
fn adverse_touch(direction: Direction, bar: &Bar, level: f64) -> bool {
    match direction {
        Direction::Long => bar.low <= level,
        Direction::Short => bar.high >= level,
    }
}

/// Bar trades through `level` in the position's favor.
fn favorable_touch(direction: Direction, bar: &Bar, level: f64) -> bool {
    match direction {
        Direction::Long => bar.high >= level,
        Direction::Short => bar.low <= level,
    }
}

/// Stop fill: the level, or the open when the bar gaps through it.
fn adverse_fill(direction: Direction, open: f64, level: f64) -> f64 {
    match direction {
        Direction::Long => open.min(level),
        Direction::Short => open.max(level),
    }
}

/// Target fill: the level, or the open when the bar gaps beyond it.
fn favorable_fill(direction: Direction, open: f64, level: f64) -> f64 {
    match direction {
        Direction::Long => open.max(level),
        Direction::Short => open.min(level),
    }
}
