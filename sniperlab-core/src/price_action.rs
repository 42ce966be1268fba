//! Candle-pattern price action.
//!
//! `detect_price_action` flags every bar; `check_candlestick_signal` is the
//! confirmation check used on the lower timeframe and as the daily fallback
//! when no entry model fires.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, CandlePattern, Direction};
use crate::indicators::{Atr, Indicator};

/// Bars required before any flag is computed (ATR14 warmup).
pub const PRICE_ACTION_MIN_BARS: usize = 15;

/// Bars required by [`check_candlestick_signal`].
pub const SIGNAL_MIN_BARS: usize = 6;

/// Volume multiple over the trailing five-bar mean a signal bar must reach.
pub const SIGNAL_VOLUME_RATIO: f64 = 1.2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleFlags {
    pub reversal_bull: bool,
    pub reversal_bear: bool,
    pub key_reversal_bull: bool,
    pub key_reversal_bear: bool,
    pub pin_bull: bool,
    pub pin_bear: bool,
    pub inside: bool,
    pub outside: bool,
    pub engulfing_bull: bool,
    pub engulfing_bear: bool,
    pub nr4: bool,
    pub nr7: bool,
    pub fakey_bull: bool,
    pub fakey_bear: bool,
    pub morning_star: bool,
    pub evening_star: bool,
}

impl CandleFlags {
    /// Strongest confirmation pattern for `direction`, by priority
    /// pinbar, engulfing, fakey, star.
    pub fn confirmation(&self, direction: Direction) -> Option<CandlePattern> {
        let (pin, engulf, fakey, star) = match direction {
            Direction::Buy => (
                self.pin_bull,
                self.engulfing_bull,
                self.fakey_bull,
                self.morning_star.then_some(CandlePattern::MorningStar),
            ),
            Direction::Sell => (
                self.pin_bear,
                self.engulfing_bear,
                self.fakey_bear,
                self.evening_star.then_some(CandlePattern::EveningStar),
            ),
        };
        if pin {
            Some(CandlePattern::PinBar)
        } else if engulf {
            Some(CandlePattern::Engulfing)
        } else if fakey {
            Some(CandlePattern::Fakey)
        } else {
            star
        }
    }
}

fn body(bar: &Bar) -> f64 {
    (bar.close - bar.open).abs()
}

fn upper_wick(bar: &Bar) -> f64 {
    bar.high - bar.open.max(bar.close)
}

fn lower_wick(bar: &Bar) -> f64 {
    bar.open.min(bar.close) - bar.low
}

/// Narrowest range of the `len` bars ending at `i`.
fn is_narrowest(bars: &[Bar], i: usize, len: usize) -> bool {
    if i + 1 < len {
        return false;
    }
    let range = bars[i].range();
    bars[i + 1 - len..=i].iter().all(|b| b.range() >= range)
}

/// Per-bar pattern flags. Empty when fewer than 15 bars are supplied.
pub fn detect_price_action(bars: &[Bar]) -> Vec<CandleFlags> {
    let n = bars.len();
    if n < PRICE_ACTION_MIN_BARS {
        return Vec::new();
    }
    let atr = Atr::new(14).compute(bars);
    let mut flags = vec![CandleFlags::default(); n];

    for i in 0..n {
        let cur = &bars[i];
        let range = cur.range();
        let f = &mut flags[i];

        // NaN during warmup makes this false.
        let wide_enough = range > atr[i] * 0.5;
        f.pin_bull = wide_enough
            && lower_wick(cur) >= 0.6 * range
            && upper_wick(cur) <= 0.3 * range;
        f.pin_bear = wide_enough
            && upper_wick(cur) >= 0.6 * range
            && lower_wick(cur) <= 0.3 * range;
        f.nr4 = is_narrowest(bars, i, 4);
        f.nr7 = is_narrowest(bars, i, 7);

        if i == 0 {
            continue;
        }
        let prev = &bars[i - 1];
        f.reversal_bull = cur.low < prev.low && cur.is_up();
        f.reversal_bear = cur.high > prev.high && cur.is_down();
        f.key_reversal_bull = cur.open < prev.open && cur.close > prev.close;
        f.key_reversal_bear = cur.open > prev.open && cur.close < prev.close;
        f.inside = cur.high < prev.high && cur.low > prev.low;
        f.outside = cur.high > prev.high && cur.low < prev.low;
        f.engulfing_bull = cur.open < prev.close && cur.close > prev.open && cur.is_up();
        f.engulfing_bear = cur.open > prev.close && cur.close < prev.open && cur.is_down();

        let prev_inside = flags[i - 1].inside;
        let f = &mut flags[i];
        f.fakey_bull = prev_inside && cur.low < prev.low && cur.close > prev.high;
        f.fakey_bear = prev_inside && cur.high > prev.high && cur.close < prev.low;

        if i >= 2 {
            let first = &bars[i - 2];
            let first_body = body(first);
            let first_mid = (first.open + first.close) / 2.0;
            let strong_first = first_body >= 0.5 * first.range() && first_body > 0.0;
            let small_middle = body(prev) <= 0.3 * first_body;
            f.morning_star = strong_first
                && first.is_down()
                && small_middle
                && cur.is_up()
                && cur.close > first_mid;
            f.evening_star = strong_first
                && first.is_up()
                && small_middle
                && cur.is_down()
                && cur.close < first_mid;
        }
    }
    flags
}

/// A confirming candle found by [`check_candlestick_signal`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleSignal {
    pub pattern: CandlePattern,
    pub direction: Direction,
    /// Index of the bar that carried the pattern.
    pub index: usize,
    /// Low (BUY) or high (SELL) of that bar.
    pub stop_reference: f64,
}

impl CandleSignal {
    pub fn label(&self) -> String {
        self.pattern.label(self.direction)
    }
}

/// Look for a confirming pattern on the latest bar, then the one before it.
///
/// A bar only counts when its volume is at least 1.2x the mean volume of the
/// five bars before the latest one.
pub fn check_candlestick_signal(bars: &[Bar], direction: Direction) -> Option<CandleSignal> {
    let n = bars.len();
    if n < SIGNAL_MIN_BARS {
        return None;
    }
    let flags = detect_price_action(bars);
    if flags.is_empty() {
        return None;
    }
    let trailing = &bars[n - 6..n - 1];
    let mean_volume = trailing.iter().map(|b| b.volume).sum::<f64>() / trailing.len() as f64;

    [n - 1, n - 2].into_iter().find_map(|idx| {
        let bar = &bars[idx];
        if bar.volume < mean_volume * SIGNAL_VOLUME_RATIO {
            return None;
        }
        let pattern = flags[idx].confirmation(direction)?;
        let stop_reference = match direction {
            Direction::Buy => bar.low,
            Direction::Sell => bar.high,
        };
        Some(CandleSignal {
            pattern,
            direction,
            index: idx,
            stop_reference,
        })
    })
}
