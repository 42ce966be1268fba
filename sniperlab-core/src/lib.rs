//! SniperLab Core — smart-money pattern engine.
//!
//! This crate contains everything that is a pure function of bar data:
//! - Domain types (bars, series, zones, signals, trades, portfolio)
//! - Swing, zone and market-structure detectors
//! - Candle price action and moving-average indicators
//! - Entry models behind one `EntryModel` trait, walked in priority order
//! - Scoring, lower-timeframe confirmation, sizing
//! - Trade lifecycle replay and the chronological portfolio merge
//!
//! No I/O happens here. Loading data, scanning many symbols and reporting
//! live in `sniperlab-runner`.

pub mod confirm;
pub mod detect;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod models;
pub mod price_action;
pub mod scoring;
pub mod simulate;
pub mod sizing;

pub use error::SeriesError;
