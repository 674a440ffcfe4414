//! PerpLab Core: risk-bounded sizing, exits and costed simulation for
//! perpetual futures.
//!
//! This crate contains:
//! - Domain types (bars, proposals, open positions, trades, snapshots)
//! - Position sizer with liquidation buffer validation and deleveraging
//! - Per-position exit state machine with ratcheting trailing stops
//! - Cost model for slippage, fees and funding
//! - Streaming ATR
//! - Bar-by-bar simulation loop that owns the ledger

pub mod cost;
pub mod domain;
pub mod engine;
pub mod error;
pub mod exit;
pub mod indicators;
pub mod risk;
pub mod rng;

pub use engine::{run_simulation, SimulationConfig, SimulationOutcome};
pub use error::{ConfigurationError, InputError, SimulationError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types that cross thread boundaries in parallel
    /// runs are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::BarSequence>();
        require_sync::<domain::BarSequence>();
        require_send::<domain::TradeProposal>();
        require_sync::<domain::TradeProposal>();
        require_send::<domain::SymbolMeta>();
        require_sync::<domain::SymbolMeta>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::EquitySnapshot>();
        require_sync::<domain::EquitySnapshot>();

        require_send::<risk::RiskConfig>();
        require_sync::<risk::RiskConfig>();
        require_send::<risk::SizingResult>();
        require_sync::<risk::SizingResult>();
        require_send::<exit::ExitStateMachine>();
        require_sync::<exit::ExitStateMachine>();
        require_send::<cost::CostModel>();
        require_sync::<cost::CostModel>();
        require_send::<rng::RngHierarchy>();
        require_sync::<rng::RngHierarchy>();

        require_send::<engine::SimulationConfig>();
        require_sync::<engine::SimulationConfig>();
        require_send::<engine::SimulationOutcome>();
        require_sync::<engine::SimulationOutcome>();
        require_send::<engine::Ledger>();
        require_sync::<engine::Ledger>();
        require_send::<SimulationError>();
        require_sync::<SimulationError>();
    }

    #[test]
    fn default_simulation_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }
}
