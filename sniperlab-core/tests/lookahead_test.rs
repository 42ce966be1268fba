//! Look-ahead contamination tests.
//!
//! Invariant: nothing computed for bar t may depend on bars after t.
//!
//! Method: compute on a truncated series (bars 0..120) and the full series
//! (bars 0..240). Values for bars that are final in both runs must match.
//! The replay path (`Series::up_to`) and the lower-timeframe cutoff
//! (`LtfSeries`) are checked the same way.

use chrono::{NaiveDate, NaiveDateTime};
use sniperlab_core::detect::{FvgDetector, SwingLocator};
use sniperlab_core::domain::{Bar, LtfSeries, Series, Timeframe};
use sniperlab_core::indicators::{Atr, Ema, Indicator, Sma};
use sniperlab_core::models::{EntryModelAggregator, ModelInput};
use sniperlab_core::price_action::detect_price_action;

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Deterministic zig-zag walk with occasional gaps.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;
    for i in 0..n {
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let change = ((seed >> 33) % 200) as f64 / 100.0 - 1.0;
        let jump = if i % 17 == 0 { 4.0 } else { 0.0 };
        let open = price;
        price = (price + change * 2.0 + jump).max(10.0);
        let close = price;
        let high = open.max(close) + 0.5 + ((seed >> 20) % 10) as f64 * 0.1;
        let low = open.min(close) - 0.5 - ((seed >> 40) % 10) as f64 * 0.1;
        let volume = 1000.0 + ((seed >> 13) % 5000) as f64;
        bars.push(Bar::new(
            base() + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume,
        ));
    }
    bars
}

fn assert_prefix_equal(name: &str, truncated: &[f64], full: &[f64]) {
    for (i, (t, f)) in truncated.iter().zip(full).enumerate() {
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            (t - f).abs() < 1e-9,
            "{name}: look-ahead at bar {i} (truncated={t}, full={f})"
        );
    }
}

#[test]
fn indicators_do_not_look_ahead() {
    let full = make_test_bars(240);
    let truncated = &full[..120];
    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(Sma::new(20)),
        Box::new(Ema::new(50)),
        Box::new(Atr::new(14)),
    ];
    for ind in &indicators {
        assert_prefix_equal(ind.name(), &ind.compute(truncated), &ind.compute(&full));
    }
}

#[test]
fn swings_are_final_once_radius_bars_follow() {
    let full = make_test_bars(240);
    let locator = SwingLocator::default();
    let k = locator.radius();
    let truncated = locator.locate(&full[..120]);
    let complete = locator.locate(&full);
    for i in 0..120 - k {
        assert_eq!(truncated.is_high(i), complete.is_high(i), "high flag at {i}");
        assert_eq!(truncated.is_low(i), complete.is_low(i), "low flag at {i}");
    }
    // the last k bars of a truncated series are never flagged
    for i in 120 - k..120 {
        assert!(!truncated.is_high(i) && !truncated.is_low(i));
    }
}

#[test]
fn price_action_flags_are_causal() {
    let full = make_test_bars(240);
    let truncated = detect_price_action(&full[..120]);
    let complete = detect_price_action(&full);
    assert_eq!(&complete[..120], &truncated[..]);
}

#[test]
fn replay_slice_matches_standalone_series() {
    let bars = make_test_bars(240);
    let series = Series::new("TEST", Timeframe::D1, bars.clone()).unwrap();
    let aggregator = EntryModelAggregator::default();
    for i in (60..240).step_by(7) {
        let replay = aggregator.evaluate(ModelInput::new(series.up_to(i)));
        let standalone = aggregator.evaluate(ModelInput::new(&bars[..=i]));
        assert_eq!(replay, standalone, "bar {i}");
    }
}

#[test]
fn fvg_on_prefix_ignores_future_fills() {
    let bars = make_test_bars(240);
    let detector = FvgDetector::default();
    // every gap found on a prefix is built only from bars inside it
    for end in [80, 120, 200] {
        for zone in detector.detect(&bars[..end]) {
            assert!(zone.origin_index + 2 < end);
        }
    }
}

#[test]
fn lower_timeframe_cutoff_hides_future_bars() {
    let start = base();
    let bars: Vec<Bar> = (0..200)
        .map(|i| {
            Bar::new(
                start + chrono::Duration::minutes(15 * i),
                100.0,
                101.0,
                99.0,
                100.0,
                1000.0,
            )
        })
        .collect();
    let series = Series::new("TEST", Timeframe::M15, bars).unwrap();
    let as_of = start + chrono::Duration::minutes(15 * 120);
    let ltf = LtfSeries::new(&series, as_of, 5);
    assert_eq!(ltf.as_of(), as_of);
    assert_eq!(ltf.bars().len(), 121);
    assert!(ltf.bars().iter().all(|b| b.timestamp <= as_of));
}
