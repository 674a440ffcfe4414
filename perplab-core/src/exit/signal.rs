//! Exit signals and evaluation errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ExitType;

/// A requested (partial or full) close, priced at its trigger level before
/// slippage. `pnl` is the price PnL at that level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitSignal {
    pub exit_type: ExitType,
    pub price: f64,
    pub quantity: f64,
    pub reason: String,
    pub pnl: f64,
}

/// At most one partial and one full close per bar. When both are present
/// the partial is applied first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExitEvaluation {
    pub partial: Option<ExitSignal>,
    pub close: Option<ExitSignal>,
}

impl ExitEvaluation {
    pub fn is_empty(&self) -> bool {
        self.partial.is_none() && self.close.is_none()
    }
}

/// Exit check could not run for this bar; retried on the next one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExitError {
    #[error("no usable price for '{symbol}'")]
    MissingPrice { symbol: String },
    #[error("bar for '{symbol}' has inconsistent prices")]
    InvalidPrice { symbol: String },
    #[error("invalid ATR {atr} for '{symbol}'")]
    InvalidAtr { symbol: String, atr: f64 },
}
