//! Risk engine: position sizing under liquidation constraints.
//!
//! - [`size`]: risk budget → notional → leverage → quantity, deleveraging
//!   until the liquidation buffer holds
//! - [`LiquidationBuffer`]: approximate liquidation price and buffer checks
//! - [`PortfolioGuard`]: aggregate open risk and position-count limits
//!
//! Everything here is pure and deterministic. Failures are values
//! ([`SizingReason`]), never panics or errors.

pub mod config;
pub mod liquidation;
pub mod portfolio;
pub mod reason;
pub mod sizer;

pub use config::{LeverageCaps, RiskConfig};
pub use liquidation::{liquidation_price, LiquidationBuffer, LiquidationCheck};
pub use portfolio::PortfolioGuard;
pub use reason::SizingReason;
pub use sizer::{size, SizingResult};
