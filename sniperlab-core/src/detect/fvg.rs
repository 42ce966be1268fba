//! Fair value gaps: three-bar imbalances the middle bar never traded through.

use crate::domain::{Bar, Zone, ZoneKind, ZoneSide};

#[derive(Debug, Clone, Copy)]
pub struct FvgDetector {
    /// Maximum number of live gaps returned.
    pub max_zones: usize,
    /// Bars after the gap inspected for a fill.
    pub future_window: usize,
    /// Minimum gap height as a fraction of the series' mean bar range.
    pub min_gap_ratio: f64,
}

impl Default for FvgDetector {
    fn default() -> Self {
        Self {
            max_zones: 5,
            future_window: 60,
            min_gap_ratio: 0.3,
        }
    }
}

impl FvgDetector {
    pub fn with_max_zones(mut self, max_zones: usize) -> Self {
        self.max_zones = max_zones;
        self
    }

    /// Minimum gap height for this series.
    pub fn min_gap(&self, bars: &[Bar]) -> f64 {
        if bars.is_empty() {
            return 0.0;
        }
        let mean_range = bars.iter().map(Bar::range).sum::<f64>() / bars.len() as f64;
        mean_range * self.min_gap_ratio
    }

    /// Live gaps, newest first.
    ///
    /// A gap at bar `i` compares bar `i - 2` with bar `i`. It is dropped when
    /// any close in the following `future_window` bars crosses back past the
    /// gap midpoint.
    pub fn detect(&self, bars: &[Bar]) -> Vec<Zone> {
        let n = bars.len();
        let mut zones = Vec::new();
        if n < 3 || self.max_zones == 0 {
            return zones;
        }
        let min_gap = self.min_gap(bars);

        for i in (2..n).rev() {
            if zones.len() >= self.max_zones {
                break;
            }
            let first = &bars[i - 2];
            let third = &bars[i];
            let future_end = (i + 1 + self.future_window).min(n);
            let future = &bars[i + 1..future_end];

            let candidate = if first.high < third.low {
                let mid = (first.high + third.low) / 2.0;
                let filled = future.iter().any(|b| b.close <= mid);
                (third.low - first.high > min_gap && !filled)
                    .then(|| Zone::new(ZoneKind::Fvg, ZoneSide::Bull, first.high, third.low, i - 2))
                    .flatten()
            } else if first.low > third.high {
                let mid = (third.high + first.low) / 2.0;
                let filled = future.iter().any(|b| b.close >= mid);
                (first.low - third.high > min_gap && !filled)
                    .then(|| Zone::new(ZoneKind::Fvg, ZoneSide::Bear, third.high, first.low, i - 2))
                    .flatten()
            } else {
                None
            };
            zones.extend(candidate);
        }
        zones
    }
}
