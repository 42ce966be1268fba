//! Average True Range with Wilder smoothing.
//!
//! TR[t] = max(high-low, |high-prev_close|, |low-prev_close|); the first bar
//! has no previous close and is left out. ATR is seeded with the mean of
//! TR[1..=period] and smoothed with alpha = 1/period. Lookback: period.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("ATR_{period}"),
        }
    }
}

/// True range of `bars[i]` against the previous close.
pub fn true_range(prev_close: f64, bar: &Bar) -> f64 {
    (bar.high - bar.low)
        .max((bar.high - prev_close).abs())
        .max((bar.low - prev_close).abs())
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut out = vec![f64::NAN; n];
        if n <= self.period {
            return out;
        }

        let tr: Vec<f64> = bars
            .windows(2)
            .map(|w| true_range(w[0].close, &w[1]))
            .collect();
        // tr[k] belongs to bar k + 1.
        let seed = &tr[..self.period];
        if seed.iter().any(|v| v.is_nan()) {
            return out;
        }
        let mut prev = seed.iter().sum::<f64>() / self.period as f64;
        out[self.period] = prev;

        let alpha = 1.0 / self.period as f64;
        for (k, &value) in tr.iter().enumerate().skip(self.period) {
            if value.is_nan() {
                break;
            }
            prev = alpha * value + (1.0 - alpha) * prev;
            out[k + 1] = prev;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::NaiveDate;

    fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| {
                Bar::new(base + chrono::Duration::days(i as i64), open, high, low, close, 1000.0)
            })
            .collect()
    }

    #[test]
    fn true_range_gap_up() {
        let bars = make_ohlc_bars(&[(98.0, 102.0, 97.0, 100.0), (110.0, 115.0, 108.0, 112.0)]);
        assert_approx(true_range(bars[0].close, &bars[1]), 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_3() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
            (101.0, 106.0, 100.0, 105.0), // TR = 6
        ]);
        let result = Atr::new(3).compute(&bars);
        assert!(result[..3].iter().all(|v| v.is_nan()));
        assert_approx(result[3], 23.0 / 3.0, DEFAULT_EPSILON);
        assert_approx(result[4], 64.0 / 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_needs_more_than_period_bars() {
        let bars = make_ohlc_bars(&[(100.0, 105.0, 95.0, 102.0), (102.0, 108.0, 100.0, 106.0)]);
        assert!(Atr::new(2).compute(&bars).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn atr_lookback() {
        assert_eq!(Atr::new(14).lookback(), 14);
        assert_eq!(Atr::new(14).name(), "ATR_14");
    }
}
