//! Domain types for PerpLab

pub mod bar;
pub mod direction;
pub mod position;
pub mod proposal;
pub mod snapshot;
pub mod symbol;
pub mod trade;

pub use bar::{Bar, BarSequence, TimeStep};
pub use direction::Direction;
pub use position::OpenPosition;
pub use proposal::TradeProposal;
pub use snapshot::EquitySnapshot;
pub use symbol::{floor_to_step, MarginTier, SymbolMeta, VolClass};
pub use trade::{ExitType, Trade};

/// Symbol type alias
pub type Symbol = String;
