//! Hard errors for malformed input.
//!
//! Expected outcomes (not enough bars, no setup, rejected trade) are never
//! errors; they are tagged values. Only structurally broken input ends up here.

use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("{symbol}: bar {index} at {timestamp} is not after the previous bar")]
    OutOfOrder {
        symbol: String,
        index: usize,
        timestamp: NaiveDateTime,
    },

    #[error("{symbol}: bar {index} at {timestamp} has inconsistent OHLCV values")]
    InsaneBar {
        symbol: String,
        index: usize,
        timestamp: NaiveDateTime,
    },

    #[error("unknown timeframe '{0}' (expected 1D, 1H or 15m)")]
    UnknownTimeframe(String),
}
