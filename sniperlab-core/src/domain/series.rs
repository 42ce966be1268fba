//! Series — an ordered, validated run of bars for one symbol and timeframe.
//!
//! Detection code works on `&[Bar]` slices borrowed from a `Series`; nothing
//! downstream ever mutates the bars. Lower-timeframe data handed to the
//! confirmer is wrapped in [`LtfSeries`], which carries its own as-of cutoff.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{Bar, Timeframe};
use crate::error::SeriesError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    symbol: String,
    timeframe: Timeframe,
    bars: Vec<Bar>,
}

impl Series {
    /// Build a series, rejecting out-of-order timestamps and insane bars.
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        bars: Vec<Bar>,
    ) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        for (index, bar) in bars.iter().enumerate() {
            if !bar.is_sane() {
                return Err(SeriesError::InsaneBar {
                    symbol,
                    index,
                    timestamp: bar.timestamp,
                });
            }
            if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
                return Err(SeriesError::OutOfOrder {
                    symbol,
                    index,
                    timestamp: bar.timestamp,
                });
            }
        }
        Ok(Self {
            symbol,
            timeframe,
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Bars `0..=index`, the only data visible when replaying bar `index`.
    pub fn up_to(&self, index: usize) -> &[Bar] {
        let end = (index + 1).min(self.bars.len());
        &self.bars[..end]
    }
}

/// Lower-timeframe bars that cannot see past an as-of instant.
///
/// The cutoff is applied at construction, so any holder of an `LtfSeries`
/// only ever sees bars with `timestamp <= as_of`.
#[derive(Debug, Clone, PartialEq)]
pub struct LtfSeries {
    timeframe: Timeframe,
    as_of: NaiveDateTime,
    bars: Vec<Bar>,
}

impl LtfSeries {
    /// Cut `series` at `as_of`, keeping at most `lookback_days` calendar days
    /// of history before the cutoff.
    pub fn new(series: &Series, as_of: NaiveDateTime, lookback_days: i64) -> Self {
        let earliest = as_of - Duration::days(lookback_days);
        let bars = series
            .bars()
            .iter()
            .filter(|b| b.timestamp <= as_of && b.timestamp >= earliest)
            .copied()
            .collect();
        Self {
            timeframe: series.timeframe(),
            as_of,
            bars,
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn as_of(&self) -> NaiveDateTime {
        self.as_of
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
