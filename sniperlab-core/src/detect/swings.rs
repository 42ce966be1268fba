//! Fractal swing highs and lows.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwingKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub index: usize,
    pub kind: SwingKind,
    pub price: f64,
}

/// Per-bar swing flags with the flagged indices cached in ascending order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Swings {
    high_flags: Vec<bool>,
    low_flags: Vec<bool>,
    highs: Vec<usize>,
    lows: Vec<usize>,
}

impl Swings {
    pub fn is_high(&self, index: usize) -> bool {
        self.high_flags.get(index).copied().unwrap_or(false)
    }

    pub fn is_low(&self, index: usize) -> bool {
        self.low_flags.get(index).copied().unwrap_or(false)
    }

    /// Indices of swing highs, oldest first.
    pub fn highs(&self) -> &[usize] {
        &self.highs
    }

    /// Indices of swing lows, oldest first.
    pub fn lows(&self) -> &[usize] {
        &self.lows
    }

    pub fn last_high(&self) -> Option<usize> {
        self.highs.last().copied()
    }

    pub fn last_low(&self) -> Option<usize> {
        self.lows.last().copied()
    }

    /// All swings as points, in index order (high before low on the same bar).
    pub fn points(&self, bars: &[Bar]) -> Vec<SwingPoint> {
        let mut points: Vec<SwingPoint> = self
            .highs
            .iter()
            .map(|&index| SwingPoint {
                index,
                kind: SwingKind::High,
                price: bars[index].high,
            })
            .chain(self.lows.iter().map(|&index| SwingPoint {
                index,
                kind: SwingKind::Low,
                price: bars[index].low,
            }))
            .collect();
        points.sort_by_key(|p| (p.index, p.kind == SwingKind::Low));
        points
    }
}

/// Marks bar `i` as a swing high (low) when its high (low) is strictly above
/// (below) every other bar in `[i - radius, i + radius]`.
#[derive(Debug, Clone, Copy)]
pub struct SwingLocator {
    radius: usize,
}

impl Default for SwingLocator {
    fn default() -> Self {
        Self { radius: 2 }
    }
}

impl SwingLocator {
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn locate(&self, bars: &[Bar]) -> Swings {
        let n = bars.len();
        let k = self.radius;
        let mut swings = Swings {
            high_flags: vec![false; n],
            low_flags: vec![false; n],
            highs: Vec::new(),
            lows: Vec::new(),
        };
        if n < 2 * k + 1 {
            return swings;
        }

        for i in k..n - k {
            let window = (i - k..=i + k).filter(|&j| j != i);
            let (mut is_high, mut is_low) = (true, true);
            for j in window {
                is_high &= bars[i].high > bars[j].high;
                is_low &= bars[i].low < bars[j].low;
                if !is_high && !is_low {
                    break;
                }
            }
            if is_high {
                swings.high_flags[i] = true;
                swings.highs.push(i);
            }
            if is_low {
                swings.low_flags[i] = true;
                swings.lows.push(i);
            }
        }
        swings
    }
}
