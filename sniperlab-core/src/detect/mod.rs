//! Pattern detectors.
//!
//! Every detector is a pure function of a bar slice (plus precomputed swings
//! where needed). Nothing here reads past the end of the slice it is given,
//! so replaying `bars[..=i]` sees exactly what a live scan at bar `i` saw.

pub mod breaker;
pub mod confluence;
pub mod fvg;
pub mod order_block;
pub mod structure;
pub mod swings;

pub use breaker::detect_breakers;
pub use confluence::ConfluenceAnnotator;
pub use fvg::FvgDetector;
pub use order_block::OrderBlockDetector;
pub use structure::{
    detect_bpr, detect_mss, detect_smt, detect_sweep, impulse_leg, ImpulseLeg, MSS_MIN_BARS,
    SWEEP_LOOKBACK,
};
pub use swings::{SwingKind, SwingLocator, SwingPoint, Swings};

/// Daily bar at `2024-01-02 + index` days.
#[cfg(test)]
pub fn bar_ohlc(index: usize, open: f64, high: f64, low: f64, close: f64) -> crate::domain::Bar {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    crate::domain::Bar::new(
        base + chrono::Duration::days(index as i64),
        open,
        high,
        low,
        close,
        1000.0,
    )
}

/// Bars from (high, low) pairs; open and close sit at the midpoint.
#[cfg(test)]
pub fn bars_from_hl(hl: &[(f64, f64)]) -> Vec<crate::domain::Bar> {
    hl.iter()
        .enumerate()
        .map(|(i, &(high, low))| {
            let mid = (high + low) / 2.0;
            bar_ohlc(i, mid, high, low, mid)
        })
        .collect()
}
