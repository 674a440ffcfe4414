//! Machine-checkable rejection reasons.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome codes from the sizer, liquidation validator and portfolio guard.
///
/// Serialized as snake_case strings (`"liquidation_buffer_unreachable"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingReason {
    Ok,
    NonPositiveEquity,
    InvalidStopDistance,
    EntryLiqBufferFail,
    SlLiqBufferFail,
    LiquidationBufferUnreachable,
    QtyRoundsToZero,
    BelowMinNotional,
    MaxConcurrentPositions,
    PortfolioRiskCapExceeded,
    /// The proposal's bar has a missing or inconsistent price.
    InvalidMarketPrice,
    /// The bar closed at or beyond the proposal's stop.
    StopBreachedAtEntry,
}

impl SizingReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SizingReason::Ok => "ok",
            SizingReason::NonPositiveEquity => "non_positive_equity",
            SizingReason::InvalidStopDistance => "invalid_stop_distance",
            SizingReason::EntryLiqBufferFail => "entry_liq_buffer_fail",
            SizingReason::SlLiqBufferFail => "sl_liq_buffer_fail",
            SizingReason::LiquidationBufferUnreachable => "liquidation_buffer_unreachable",
            SizingReason::QtyRoundsToZero => "qty_rounds_to_zero",
            SizingReason::BelowMinNotional => "below_min_notional",
            SizingReason::MaxConcurrentPositions => "max_concurrent_positions",
            SizingReason::PortfolioRiskCapExceeded => "portfolio_risk_cap_exceeded",
            SizingReason::InvalidMarketPrice => "invalid_market_price",
            SizingReason::StopBreachedAtEntry => "stop_breached_at_entry",
        }
    }
}

impl fmt::Display for SizingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
