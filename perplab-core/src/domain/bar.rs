//! Bar: the fundamental market data unit, and the time-ordered sequence the
//! simulation clock walks.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// OHLCV bar for a single perpetual contract over one interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() || !self.high.is_finite() || !self.low.is_finite() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
    }
}

/// All bars that share one timestamp, keyed by symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeStep {
    pub timestamp: DateTime<Utc>,
    pub bars: BTreeMap<String, Bar>,
}

/// Validated, time-ordered bars for one or more symbols.
///
/// Construction rejects per-symbol timestamps that do not strictly increase.
/// Bars with missing or inconsistent prices are kept; the loop skips them per
/// symbol. Steps are ordered by timestamp; within a step symbols iterate in
/// lexical order, which keeps multi-symbol runs deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarSequence {
    steps: Vec<TimeStep>,
}

impl BarSequence {
    /// Build from bars in per-symbol chronological order. Symbols may be
    /// interleaved arbitrarily.
    pub fn from_bars(bars: impl IntoIterator<Item = Bar>) -> Result<Self, InputError> {
        let mut last_seen: HashMap<String, DateTime<Utc>> = HashMap::new();
        let mut by_time: BTreeMap<DateTime<Utc>, BTreeMap<String, Bar>> = BTreeMap::new();

        for bar in bars {
            if let Some(prev) = last_seen.get(&bar.symbol) {
                if bar.timestamp <= *prev {
                    return Err(InputError::NonMonotonicBars {
                        symbol: bar.symbol,
                        timestamp: bar.timestamp,
                    });
                }
            }
            last_seen.insert(bar.symbol.clone(), bar.timestamp);
            by_time
                .entry(bar.timestamp)
                .or_default()
                .insert(bar.symbol.clone(), bar);
        }

        if by_time.is_empty() {
            return Err(InputError::EmptyBars);
        }

        let steps = by_time
            .into_iter()
            .map(|(timestamp, bars)| TimeStep { timestamp, bars })
            .collect();
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[TimeStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Every symbol that appears at least once, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .steps
            .iter()
            .flat_map(|s| s.bars.keys().cloned())
            .collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }

    /// Returns true if `symbol` has a bar at `timestamp`.
    pub fn contains(&self, symbol: &str, timestamp: DateTime<Utc>) -> bool {
        self.steps
            .binary_search_by(|s| s.timestamp.cmp(&timestamp))
            .map(|i| self.steps[i].bars.contains_key(symbol))
            .unwrap_or(false)
    }
}
