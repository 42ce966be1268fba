//! Lower-timeframe confirmation of a daily setup.
//!
//! The daily aggregator decides the direction; this module only looks for
//! agreement on a finer series and refines entry and stop when it finds it.

use chrono::{NaiveDateTime, Timelike};

use crate::domain::{Bar, ConfirmationResult, Direction, LtfSeries, Timeframe};
use crate::models::{EntryModelAggregator, ModelInput};
use crate::price_action::check_candlestick_signal;

/// Stop buffer applied to the raw refined stop.
pub const STOP_BUFFER: f64 = 0.03;

/// Hour before which the hourly series is used.
pub const HOURLY_CUTOFF_HOUR: u32 = 11;

/// Supplies lower-timeframe bars that end at or before `as_of`.
pub trait LowerTimeframeSource: Send + Sync {
    fn lower_timeframe(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback_days: i64,
        as_of: NaiveDateTime,
    ) -> Option<LtfSeries>;
}

/// 1H over 20 days before 11:00, otherwise 15m over 5 days.
pub fn confirmation_timeframe(as_of: NaiveDateTime) -> (Timeframe, i64) {
    if as_of.hour() < HOURLY_CUTOFF_HOUR {
        (Timeframe::H1, 20)
    } else {
        (Timeframe::M15, 5)
    }
}

#[derive(Debug)]
pub struct MultiTimeframeConfirmer {
    aggregator: EntryModelAggregator,
    buffer: f64,
}

impl Default for MultiTimeframeConfirmer {
    fn default() -> Self {
        Self::new(EntryModelAggregator::default())
    }
}

impl MultiTimeframeConfirmer {
    pub fn new(aggregator: EntryModelAggregator) -> Self {
        Self {
            aggregator,
            buffer: STOP_BUFFER,
        }
    }

    /// Fetch the lower timeframe for `as_of` from `source` and confirm on it.
    pub fn confirm(
        &self,
        source: &dyn LowerTimeframeSource,
        symbol: &str,
        direction: Direction,
        htf: &[Bar],
        as_of: NaiveDateTime,
    ) -> ConfirmationResult {
        let (timeframe, days) = confirmation_timeframe(as_of);
        match source.lower_timeframe(symbol, timeframe, days, as_of) {
            Some(ltf) => self.confirm_with(direction, htf, &ltf),
            None => ConfirmationResult::unconfirmed(),
        }
    }

    /// Entry models on `ltf` restricted to `direction` first, then a candle
    /// pattern. Any confirmation agrees with `direction`.
    pub fn confirm_with(
        &self,
        direction: Direction,
        htf: &[Bar],
        ltf: &LtfSeries,
    ) -> ConfirmationResult {
        let bars = ltf.bars();
        let Some(last) = bars.last() else {
            return ConfirmationResult::unconfirmed();
        };

        let input = ModelInput::new(bars).with_higher(htf);
        if let Some(signal) = self.aggregator.evaluate_directed(input, Some(direction)) {
            let raw = match (&signal.zone, direction) {
                (Some(zone), Direction::Buy) => zone.lower(),
                (Some(zone), Direction::Sell) => zone.upper(),
                (None, Direction::Buy) => last.low,
                (None, Direction::Sell) => last.high,
            };
            return ConfirmationResult {
                confirmed: true,
                timeframe: Some(ltf.timeframe()),
                pattern_name: format!("{} (HTF->LTF)", signal.model),
                candle: None,
                refined_entry: Some(last.close),
                refined_stop: Some(self.buffered(direction, raw)),
            };
        }

        if let Some(candle) = check_candlestick_signal(bars, direction) {
            return ConfirmationResult {
                confirmed: true,
                timeframe: Some(ltf.timeframe()),
                pattern_name: format!("{} (Sniper)", candle.label()),
                candle: Some(candle.pattern),
                refined_entry: Some(last.close),
                refined_stop: Some(self.buffered(direction, candle.stop_reference)),
            };
        }

        ConfirmationResult::unconfirmed()
    }

    fn buffered(&self, direction: Direction, raw: f64) -> f64 {
        match direction {
            Direction::Buy => raw * (1.0 - self.buffer),
            Direction::Sell => raw * (1.0 + self.buffer),
        }
    }
}
