//! Market structure: shifts, liquidity sweeps, SMT divergence, balanced
//! price ranges and the impulse leg behind OTE entries.

use serde::{Deserialize, Serialize};

use super::Swings;
use crate::domain::{Bar, Direction, StructureShift, SweepKind, Zone, ZoneSide};

/// Bars required before a structure shift is evaluated.
pub const MSS_MIN_BARS: usize = 20;

/// Default window for liquidity sweeps.
pub const SWEEP_LOOKBACK: usize = 20;

/// OTE band as retracement fractions of the impulse leg.
pub const OTE_SHALLOW: f64 = 0.618;
pub const OTE_DEEP: f64 = 0.786;

/// Latest close beyond the second-most-recent swing high (BULL) or swing low
/// (BEAR). Bull is checked first.
pub fn detect_mss(bars: &[Bar], swings: &Swings) -> Option<StructureShift> {
    if bars.len() < MSS_MIN_BARS {
        return None;
    }
    let close = bars.last()?.close;
    let highs = swings.highs();
    if highs.len() >= 2 && close > bars[highs[highs.len() - 2]].high {
        return Some(StructureShift::Bull);
    }
    let lows = swings.lows();
    if lows.len() >= 2 && close < bars[lows[lows.len() - 2]].low {
        return Some(StructureShift::Bear);
    }
    None
}

/// The latest bar runs the extreme of the previous `lookback` bars and closes
/// back inside it.
pub fn detect_sweep(bars: &[Bar], lookback: usize) -> Option<SweepKind> {
    let n = bars.len();
    if lookback == 0 || n < lookback + 1 {
        return None;
    }
    let last = &bars[n - 1];
    let window = &bars[n - 1 - lookback..n - 1];
    let window_low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let window_high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);

    if last.low < window_low && last.close > window_low {
        Some(SweepKind::SellSide)
    } else if last.high > window_high && last.close < window_high {
        Some(SweepKind::BuySide)
    } else {
        None
    }
}

/// Divergence between the last two bars of a series and a correlated pair.
///
/// BEAR when the main series makes a higher high the pair fails to confirm;
/// BULL when it makes a lower low the pair fails to confirm.
pub fn detect_smt(main: &[Bar], pair: &[Bar]) -> Option<StructureShift> {
    if main.len() < 3 || pair.len() < 2 {
        return None;
    }
    let (m1, m0) = (&main[main.len() - 2], &main[main.len() - 1]);
    let (p1, p0) = (&pair[pair.len() - 2], &pair[pair.len() - 1]);
    if m0.high > m1.high && p0.high <= p1.high {
        Some(StructureShift::Bear)
    } else if m0.low < m1.low && p0.low >= p1.low {
        Some(StructureShift::Bull)
    } else {
        None
    }
}

/// First overlap between a bull and a bear gap, scanning bull gaps in order.
pub fn detect_bpr(fvgs: &[Zone]) -> Option<(f64, f64)> {
    let bulls = fvgs.iter().filter(|z| z.side == ZoneSide::Bull);
    for bull in bulls {
        for bear in fvgs.iter().filter(|z| z.side == ZoneSide::Bear) {
            if let Some(overlap) = bull.overlap(bear) {
                return Some(overlap);
            }
        }
    }
    None
}

/// The most recent impulse leg and its optimal-trade-entry band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpulseLeg {
    /// Direction of the leg (BUY for an up-leg).
    pub direction: Direction,
    pub low: f64,
    pub high: f64,
    pub ote_low: f64,
    pub ote_high: f64,
}

impl ImpulseLeg {
    pub fn in_ote(&self, price: f64) -> bool {
        price >= self.ote_low && price <= self.ote_high
    }
}

/// Trend is UP when the latest swing high is newer than the latest swing low.
///
/// For an up-leg the leg runs from the last swing low to the highest high
/// since; the OTE band is the 61.8%–78.6% retracement down from that high.
/// A down-leg mirrors this from the last swing high.
pub fn impulse_leg(bars: &[Bar], swings: &Swings) -> Option<ImpulseLeg> {
    let last_high = swings.last_high()?;
    let last_low = swings.last_low()?;

    let (direction, low, high) = if last_high > last_low {
        let low = bars[last_low].low;
        let high = bars[last_low..]
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max);
        (Direction::Buy, low, high)
    } else {
        let high = bars[last_high].high;
        let low = bars[last_high..]
            .iter()
            .map(|b| b.low)
            .fold(f64::INFINITY, f64::min);
        (Direction::Sell, low, high)
    };
    if high <= low {
        return None;
    }

    let leg = high - low;
    let (ote_low, ote_high) = match direction {
        Direction::Buy => (high - OTE_DEEP * leg, high - OTE_SHALLOW * leg),
        Direction::Sell => (low + OTE_SHALLOW * leg, low + OTE_DEEP * leg),
    };
    Some(ImpulseLeg {
        direction,
        low,
        high,
        ote_low,
        ote_high,
    })
}
