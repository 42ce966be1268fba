//! Order blocks: the last opposing swing before a close breaks structure.

use super::Swings;
use crate::domain::{Bar, Zone, ZoneKind, ZoneSide};

#[derive(Debug, Clone, Copy)]
pub struct OrderBlockDetector {
    /// Only swings inside the most recent `lookback` bars are considered.
    pub lookback: usize,
    pub max_obs: usize,
    /// Series shorter than this yield no blocks.
    pub min_bars: usize,
}

impl Default for OrderBlockDetector {
    fn default() -> Self {
        Self {
            lookback: 120,
            max_obs: 5,
            min_bars: 30,
        }
    }
}

impl OrderBlockDetector {
    /// Live order blocks ordered by origin ascending; the last one is the newest.
    ///
    /// Bull: for each swing high, find the first later close above it; the
    /// origin is the latest swing low before that break bar. The block is the
    /// origin bar's full range and stays live while the latest close is above
    /// its low. Bear mirrors this.
    pub fn detect(&self, bars: &[Bar], swings: &Swings) -> Vec<Zone> {
        let n = bars.len();
        if n < self.min_bars || n == 0 || self.max_obs == 0 {
            return Vec::new();
        }
        let start = n.saturating_sub(self.lookback);
        let highs: Vec<usize> = swings.highs().iter().copied().filter(|&i| i >= start).collect();
        let lows: Vec<usize> = swings.lows().iter().copied().filter(|&i| i >= start).collect();
        let last_close = bars[n - 1].close;

        let mut found: Vec<(ZoneSide, usize)> = Vec::new();
        for &peak in &highs {
            let level = bars[peak].high;
            let Some(brk) = (peak + 1..n).find(|&j| bars[j].close > level) else {
                continue;
            };
            if let Some(&origin) = lows.iter().rev().find(|&&l| l < brk) {
                if last_close > bars[origin].low {
                    found.push((ZoneSide::Bull, origin));
                }
            }
        }
        for &trough in &lows {
            let level = bars[trough].low;
            let Some(brk) = (trough + 1..n).find(|&j| bars[j].close < level) else {
                continue;
            };
            if let Some(&origin) = highs.iter().rev().find(|&&h| h < brk) {
                if last_close < bars[origin].high {
                    found.push((ZoneSide::Bear, origin));
                }
            }
        }

        let mut seen = Vec::with_capacity(found.len());
        found.retain(|key| {
            if seen.contains(key) {
                false
            } else {
                seen.push(*key);
                true
            }
        });
        found.sort_by_key(|&(_, origin)| origin);

        let zones: Vec<Zone> = found
            .into_iter()
            .filter_map(|(side, origin)| {
                let bar = &bars[origin];
                Zone::new(ZoneKind::OrderBlock, side, bar.low, bar.high, origin)
            })
            .collect();
        let skip = zones.len().saturating_sub(self.max_obs);
        zones.into_iter().skip(skip).collect()
    }
}
