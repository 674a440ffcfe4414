//! Setup-time error types.
//!
//! Everything here is fail-fast: it is raised while validating inputs and
//! configuration, before the first bar is simulated. Per-symbol problems that
//! surface inside the bar loop are recorded on the outcome instead.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Malformed market data or trade proposals.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("bar sequence is empty")]
    EmptyBars,

    #[error("bars for '{symbol}' are not strictly increasing at {timestamp}")]
    NonMonotonicBars {
        symbol: String,
        timestamp: DateTime<Utc>,
    },

    #[error("proposal for '{symbol}' at {timestamp}: {reason}")]
    MalformedProposal {
        symbol: String,
        timestamp: DateTime<Utc>,
        reason: String,
    },

    #[error("more than one proposal for '{symbol}' at {timestamp}")]
    DuplicateProposal {
        symbol: String,
        timestamp: DateTime<Utc>,
    },

    #[error("proposal for '{symbol}' at {timestamp} has no matching bar")]
    UnmatchedProposal {
        symbol: String,
        timestamp: DateTime<Utc>,
    },
}

/// Invalid parameters or missing symbol metadata.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("no symbol metadata for '{0}'")]
    MissingSymbolMeta(String),

    #[error("symbol '{symbol}': {reason}")]
    InvalidSymbolMeta { symbol: String, reason: String },

    #[error("invalid parameter '{field}': {reason}")]
    InvalidParameter { field: &'static str, reason: String },
}

impl ConfigurationError {
    pub(crate) fn param(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors that abort a simulation before it starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("input error: {0}")]
    Input(#[from] InputError),
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}
