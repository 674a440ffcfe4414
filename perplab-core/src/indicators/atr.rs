//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR uses Wilder smoothing (alpha = 1/period), seeded with the mean of the
//! first `period` true ranges. The first bar has no previous close and does
//! not contribute.

use crate::domain::Bar;

pub const DEFAULT_ATR_PERIOD: usize = 14;

/// Incremental Wilder ATR for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingAtr {
    period: usize,
    prev_close: Option<f64>,
    seed_sum: f64,
    seed_count: usize,
    value: Option<f64>,
}

impl StreamingAtr {
    /// `period` of zero is treated as one.
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            prev_close: None,
            seed_sum: 0.0,
            seed_count: 0,
            value: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Current ATR, `None` during warm-up.
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Feed one bar; returns the updated ATR once warm. Void bars are ignored.
    pub fn update(&mut self, bar: &Bar) -> Option<f64> {
        if bar.is_void() {
            return self.value;
        }
        let Some(prev_close) = self.prev_close.replace(bar.close) else {
            return None;
        };
        let tr = bar_true_range(bar, prev_close);

        self.value = match self.value {
            Some(prev) => {
                let alpha = 1.0 / self.period as f64;
                Some(alpha * tr + (1.0 - alpha) * prev)
            }
            None => {
                self.seed_sum += tr;
                self.seed_count += 1;
                (self.seed_count == self.period).then(|| self.seed_sum / self.period as f64)
            }
        };
        self.value
    }
}

impl Default for StreamingAtr {
    fn default() -> Self {
        Self::new(DEFAULT_ATR_PERIOD)
    }
}

fn bar_true_range(bar: &Bar, prev_close: f64) -> f64 {
    (bar.high - bar.low)
        .max((bar.high - prev_close).abs())
        .max((bar.low - prev_close).abs())
}

/// True Range series. `TR[0]` is NaN (no previous close).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = vec![f64::NAN; bars.len()];
    for i in 1..bars.len() {
        tr[i] = bar_true_range(&bars[i], bars[i - 1].close);
    }
    tr
}

/// Wilder smoothing over a series with a NaN prefix. The seed is the mean of
/// the first `period` finite values; output is NaN before it.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 {
        return result;
    }
    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return result;
    };
    let seed_end = start + period;
    if seed_end > n || values[start..seed_end].iter().any(|v| v.is_nan()) {
        return result;
    }

    let mut sum = 0.0;
    for v in &values[start..seed_end] {
        sum += v;
    }
    let mut prev = sum / period as f64;
    result[seed_end - 1] = prev;

    let alpha = 1.0 / period as f64;
    for i in seed_end..n {
        if values[i].is_nan() {
            break;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}

/// Batch ATR; NaN until warm.
pub fn atr_series(bars: &[Bar], period: usize) -> Vec<f64> {
    wilder_smooth(&true_range(bars), period)
}
