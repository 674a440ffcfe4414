//! Deterministic RNG hierarchy.
//!
//! A master seed generates an independent sub-seed per `(symbol, stream)`
//! pair via BLAKE3, so a symbol's random draws do not depend on which other
//! symbols are simulated or in what order they are processed.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Sub-seed for one symbol and stream.
    pub fn sub_seed(&self, symbol: &str, stream: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        hasher.update(&stream.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn rng_for(&self, symbol: &str, stream: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(symbol, stream))
    }
}

/// Stream used for fill slippage.
pub const SLIPPAGE_STREAM: u64 = 0;
