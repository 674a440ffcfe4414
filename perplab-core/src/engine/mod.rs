//! Simulation clock and ledger.
//!
//! Per bar:
//! 1. Snapshot equity before any update
//! 2. Evaluate exits for open positions and book their fills
//! 3. Size and open this bar's proposals
//! 4. Accrue funding on everything still open
//!
//! At the end of the sequence (or on cancellation) all remaining positions
//! are closed through the manual exit path.

pub mod event_loop;
pub mod ledger;
pub mod state;

pub use event_loop::run_simulation;
pub use ledger::{Ledger, PositionBook};
pub use state::{ExitFault, Rejection, SimulationConfig, SimulationOutcome};
