//! Indicators over bar history, plus the moving-average snapshot used for
//! zone confluence.
//!
//! Indicators are pure functions: bar history in, numeric series out, with
//! `f64::NAN` during warmup. No value at bar t may depend on bar t+1 or later.

pub mod atr;
pub mod ema;
pub mod sma;

pub use atr::Atr;
pub use ema::Ema;
pub use sma::Sma;

use crate::domain::Bar;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce an output series of the same
/// length. The first `lookback()` values are `f64::NAN`.
pub trait Indicator: Send + Sync {
    /// Name as used in snapshots and labels (e.g. "SMA_20", "ATR_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;

    /// Value at the latest bar, if past warmup.
    fn latest(&self, bars: &[Bar]) -> Option<f64> {
        self.compute(bars).last().copied().filter(|v| v.is_finite())
    }
}

/// Latest values of named moving averages, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaSnapshot {
    values: Vec<(String, f64)>,
}

impl MaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value. Non-finite or non-positive values are ignored.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        if !value.is_finite() || value <= 0.0 {
            return;
        }
        let name = name.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    /// Snapshot of the standard averages at the latest bar: SMA 10/20/50/100/200
    /// and EMA 50/100/200.
    pub fn from_bars(bars: &[Bar]) -> Self {
        let averages: Vec<Box<dyn Indicator>> = vec![
            Box::new(Sma::new(10)),
            Box::new(Sma::new(20)),
            Box::new(Ema::new(50)),
            Box::new(Sma::new(50)),
            Box::new(Ema::new(100)),
            Box::new(Sma::new(100)),
            Box::new(Ema::new(200)),
            Box::new(Sma::new(200)),
        ];
        let mut snapshot = Self::new();
        for ma in &averages {
            if let Some(v) = ma.latest(bars) {
                snapshot.insert(ma.name(), v);
            }
        }
        snapshot
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Create synthetic daily bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high = max(open,close) + 1.0,
/// low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                base + chrono::Duration::days(i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000.0,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
