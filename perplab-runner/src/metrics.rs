//! Performance metrics: pure functions that compute run statistics.
//!
//! Every metric is a pure function: equity values and/or trade list in,
//! scalar out. Ratios are annualized with √252 over per-bar returns.
//! Degenerate inputs (no trades, flat equity) yield 0.0, never NaN.

use serde::{Deserialize, Serialize};

use perplab_core::domain::Trade;

const ANNUALIZATION: f64 = 252.0;

/// Aggregate performance metrics for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    /// Σ price PnL before costs.
    pub gross_pnl: f64,
    /// Σ net PnL after fees and funding.
    pub total_pnl: f64,
    pub avg_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub total_fees: f64,
    pub total_funding: f64,
    pub total_slippage: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub profit_factor: f64,
    pub avg_trade_duration_hours: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
}

impl PerformanceMetrics {
    /// Compute all metrics from the trade list and equity values.
    pub fn compute(
        trades: &[Trade],
        equity_curve: &[f64],
        initial_equity: f64,
        final_equity: f64,
    ) -> Self {
        let ret = total_return(initial_equity, final_equity);
        let dd = max_drawdown(equity_curve);
        let winning_trades = trades.iter().filter(|t| t.is_winner()).count();
        Self {
            total_trades: trades.len(),
            winning_trades,
            losing_trades: trades.len() - winning_trades,
            win_rate: win_rate(trades),
            gross_pnl: trades.iter().map(|t| t.pnl).sum(),
            total_pnl: trades.iter().map(|t| t.net_pnl).sum(),
            avg_pnl: mean_f64(&trades.iter().map(|t| t.net_pnl).collect::<Vec<_>>()),
            avg_win: avg_win(trades),
            avg_loss: avg_loss(trades),
            total_fees: trades.iter().map(|t| t.fees).sum(),
            total_funding: trades.iter().map(|t| t.funding).sum(),
            total_slippage: trades.iter().map(|t| t.slippage).sum(),
            total_return: ret,
            max_drawdown: dd,
            sharpe: sharpe_ratio(equity_curve),
            sortino: sortino_ratio(equity_curve),
            calmar: calmar_ratio(ret, dd),
            profit_factor: profit_factor(trades),
            avg_trade_duration_hours: avg_trade_duration_hours(trades),
            max_consecutive_wins: max_consecutive_wins(trades),
            max_consecutive_losses: max_consecutive_losses(trades),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(initial_equity: f64, final_equity: f64) -> f64 {
    if initial_equity <= 0.0 {
        return 0.0;
    }
    (final_equity - initial_equity) / initial_equity
}

/// Annualized Sharpe ratio from per-bar returns.
///
/// Returns 0.0 if variance is zero or there are fewer than two returns.
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns = bar_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(&returns);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * ANNUALIZATION.sqrt()
}

/// Annualized Sortino ratio.
///
/// The denominator is the sample standard deviation of the negative returns
/// alone. Returns 0.0 with fewer than two negative returns or when they do
/// not vary.
pub fn sortino_ratio(equity_curve: &[f64]) -> f64 {
    let returns = bar_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(&returns);

    let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    let downside_std = std_dev(&downside);
    if downside_std < 1e-15 {
        return 0.0;
    }
    (mean / downside_std) * ANNUALIZATION.sqrt()
}

/// Calmar ratio: total return / |max drawdown|. Zero without a drawdown.
pub fn calmar_ratio(total_return: f64, max_drawdown: f64) -> f64 {
    if max_drawdown >= 0.0 {
        return 0.0;
    }
    total_return / max_drawdown.abs()
}

/// Maximum peak-to-trough drawdown as a negative fraction
/// (e.g., -0.15 = 15% drawdown).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Fraction of trades with positive net PnL.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Mean net PnL of winning trades.
pub fn avg_win(trades: &[Trade]) -> f64 {
    let wins: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.net_pnl)
        .collect();
    mean_f64(&wins)
}

/// Mean net PnL of non-winning trades (zero or negative).
pub fn avg_loss(trades: &[Trade]) -> f64 {
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| !t.is_winner())
        .map(|t| t.net_pnl)
        .collect();
    mean_f64(&losses)
}

/// Gross profits / gross losses.
///
/// Capped at 100.0 when there are no losses.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.net_pnl > 0.0)
        .map(|t| t.net_pnl)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.net_pnl < 0.0)
        .map(|t| t.net_pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Mean holding time in hours.
pub fn avg_trade_duration_hours(trades: &[Trade]) -> f64 {
    let hours: Vec<f64> = trades.iter().map(Trade::duration_hours).collect();
    mean_f64(&hours)
}

pub fn max_consecutive_wins(trades: &[Trade]) -> usize {
    max_consecutive(trades, true)
}

pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    max_consecutive(trades, false)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive equity values.
pub fn bar_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 {
                (w[1] - w[0]) / w[0]
            } else {
                0.0
            }
        })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn max_consecutive(trades: &[Trade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for trade in trades {
        if trade.is_winner() == winners {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}
