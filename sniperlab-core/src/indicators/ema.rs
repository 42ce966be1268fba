//! Exponential Moving Average of closes.
//!
//! EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1),
//! seeded with the SMA of the first `period` closes. Lookback: period - 1.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("EMA_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut out = vec![f64::NAN; n];
        if self.period == 0 || n < self.period {
            return out;
        }

        let seed_window = &bars[..self.period];
        if seed_window.iter().any(|b| b.close.is_nan()) {
            return out;
        }
        let mut prev = seed_window.iter().map(|b| b.close).sum::<f64>() / self.period as f64;
        out[self.period - 1] = prev;

        let alpha = 2.0 / (self.period as f64 + 1.0);
        for (i, bar) in bars.iter().enumerate().skip(self.period) {
            // Once tainted, the recursion never recovers.
            if bar.close.is_nan() {
                break;
            }
            prev = alpha * bar.close + (1.0 - alpha) * prev;
            out[i] = prev;
        }
        out
    }
}
