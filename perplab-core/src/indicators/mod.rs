//! Volatility indicators.
//!
//! The simulation updates a [`StreamingAtr`] once per bar instead of
//! recomputing from full history. The batch functions exist for callers that
//! hold a whole series and must agree with the streaming values exactly.

pub mod atr;

pub use atr::{atr_series, true_range, wilder_smooth, StreamingAtr, DEFAULT_ATR_PERIOD};
