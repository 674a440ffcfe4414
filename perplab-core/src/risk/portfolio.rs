//! Portfolio-level admission checks applied after sizing.

use super::config::RiskConfig;
use super::reason::SizingReason;

/// Limits on concurrent positions and aggregate open risk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioGuard {
    pub max_concurrent_positions: usize,
    pub max_portfolio_risk: f64,
}

impl From<&RiskConfig> for PortfolioGuard {
    fn from(config: &RiskConfig) -> Self {
        Self {
            max_concurrent_positions: config.max_concurrent_positions,
            max_portfolio_risk: config.max_portfolio_risk,
        }
    }
}

impl PortfolioGuard {
    /// Admit a new position carrying `new_risk` given `open_count` positions
    /// whose stops put `open_risk` at stake.
    pub fn check(
        &self,
        equity: f64,
        open_count: usize,
        open_risk: f64,
        new_risk: f64,
    ) -> Result<(), SizingReason> {
        if open_count >= self.max_concurrent_positions {
            return Err(SizingReason::MaxConcurrentPositions);
        }
        // Risk summing exactly to the cap is admitted.
        let budget = self.max_portfolio_risk * equity * (1.0 + 1e-9);
        if open_risk + new_risk > budget {
            return Err(SizingReason::PortfolioRiskCapExceeded);
        }
        Ok(())
    }
}
