//! Domain types for SniperLab

pub mod bar;
pub mod portfolio;
pub mod series;
pub mod signal;
pub mod timeframe;
pub mod trade;
pub mod zone;

pub use bar::Bar;
pub use portfolio::{LedgerEntry, Portfolio};
pub use series::{LtfSeries, Series};
pub use signal::{
    CandlePattern, ConfirmationResult, Direction, EntrySignal, ModelTier, ScoreResult,
    StructureShift, SweepKind,
};
pub use timeframe::Timeframe;
pub use trade::{Trade, TradeState};
pub use zone::{Strength, Zone, ZoneKind, ZoneSide};
