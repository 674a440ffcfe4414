//! Per-bar equity snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Realized equity and open-position count at the start of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquitySnapshot {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
    pub open_positions: usize,
}
