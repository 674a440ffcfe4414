//! Exit management for open positions.
//!
//! Each position gets its own [`ExitStateMachine`]. Per bar it checks, in
//! priority order:
//!
//! 1. Stop-loss touch → full close (wins over every other condition)
//! 2. Take-profit touch → full close
//! 3. Partial target (once per position) → partial close, stop to break-even
//! 4. Trailing stop crossing → full close; otherwise the trail ratchets
//! 5. Holding time limit → full close
//!
//! Manual exits bypass the checks and are used for end-of-run liquidation.

pub mod policy;
pub mod ratchet;
pub mod signal;
pub mod state_machine;

pub use policy::{ExitConfig, ExitPolicy, PartialExit};
pub use ratchet::RatchetState;
pub use signal::{ExitError, ExitEvaluation, ExitSignal};
pub use state_machine::{ExitState, ExitStateMachine};
