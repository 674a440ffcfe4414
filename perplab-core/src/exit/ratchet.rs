//! Ratchet invariant for trailing stops.
//!
//! **Core rule:** a trail may tighten, never loosen, even when ATR expands.

use crate::domain::Direction;

/// Monotonic stop level.
///
/// - Long: the level can only rise
/// - Short: the level can only fall
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatchetState {
    level: f64,
    direction: Direction,
}

impl RatchetState {
    pub fn with_initial_level(direction: Direction, level: f64) -> Self {
        Self { level, direction }
    }

    /// Propose a new level; returns the ratcheted level.
    ///
    /// ```
    /// use perplab_core::domain::Direction;
    /// use perplab_core::exit::RatchetState;
    ///
    /// let mut trail = RatchetState::with_initial_level(Direction::Long, 95.0);
    /// assert_eq!(trail.apply(100.0), 100.0);
    /// assert_eq!(trail.apply(90.0), 100.0);
    /// ```
    pub fn apply(&mut self, proposed: f64) -> f64 {
        if proposed.is_finite() {
            self.level = match self.direction {
                Direction::Long => self.level.max(proposed),
                Direction::Short => self.level.min(proposed),
            };
        }
        self.level
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}
