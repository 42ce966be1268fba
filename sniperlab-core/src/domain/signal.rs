//! Signal vocabulary shared by detectors, models, scoring and confirmation.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Timeframe, Zone, ZoneSide};

/// Trade direction of a setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
        }
    }

    /// +1 for BUY, -1 for SELL.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Buy => 1.0,
            Direction::Sell => -1.0,
        }
    }

    /// Zone side that supports this direction (demand for BUY, supply for SELL).
    pub fn zone_side(self) -> ZoneSide {
        match self {
            Direction::Buy => ZoneSide::Bull,
            Direction::Sell => ZoneSide::Bear,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market structure shift: latest close beyond the second-most-recent swing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StructureShift {
    Bull,
    Bear,
}

impl StructureShift {
    pub fn direction(self) -> Direction {
        match self {
            StructureShift::Bull => Direction::Buy,
            StructureShift::Bear => Direction::Sell,
        }
    }
}

/// Which pool of resting liquidity the latest bar ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SweepKind {
    /// Lows taken and reclaimed; bullish.
    SellSide,
    /// Highs taken and rejected; bearish.
    BuySide,
}

impl SweepKind {
    /// Direction a sweep argues for.
    pub fn direction(self) -> Direction {
        match self {
            SweepKind::SellSide => Direction::Buy,
            SweepKind::BuySide => Direction::Sell,
        }
    }
}

/// Scoring class of an entry model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Unicorn, Silver Bullet, SMT variants.
    Premium,
    /// ICT 2022, breaker retest, OTE pullback.
    Advanced,
    /// Plain structure models (MSS, sweep + BPR, HTF pullback).
    Basic,
}

/// Candle patterns recognised by the price-action detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandlePattern {
    PinBar,
    Engulfing,
    Fakey,
    MorningStar,
    EveningStar,
    OutsideBar,
    ReversalBar,
    KeyReversal,
}

impl CandlePattern {
    pub fn name(self) -> &'static str {
        match self {
            CandlePattern::PinBar => "Pinbar",
            CandlePattern::Engulfing => "Engulfing",
            CandlePattern::Fakey => "Fakey",
            CandlePattern::MorningStar => "Morning Star",
            CandlePattern::EveningStar => "Evening Star",
            CandlePattern::OutsideBar => "Outside Bar",
            CandlePattern::ReversalBar => "Reversal Bar",
            CandlePattern::KeyReversal => "Key Reversal",
        }
    }

    /// Display label including direction, e.g. `Pinbar (Bull)`.
    pub fn label(self, direction: Direction) -> String {
        match (self, direction) {
            (CandlePattern::MorningStar | CandlePattern::EveningStar, _) => self.name().to_string(),
            (_, Direction::Buy) => format!("{} (Bull)", self.name()),
            (_, Direction::Sell) => format!("{} (Bear)", self.name()),
        }
    }
}

/// Output of the entry-model aggregator. Absence of a signal means "no setup".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySignal {
    pub direction: Direction,
    pub model: String,
    pub tier: ModelTier,
    pub zone: Option<Zone>,
}

impl EntrySignal {
    pub fn new(direction: Direction, model: &str, tier: ModelTier, zone: Option<Zone>) -> Self {
        Self {
            direction,
            model: model.to_string(),
            tier,
            zone,
        }
    }
}

/// Bounded setup score in `[0, 5]` plus the tags that contributed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub raw_score: f64,
    pub tags: Vec<String>,
}

/// Lower-timeframe confirmation outcome.
///
/// Prices are `None` whenever `confirmed` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationResult {
    pub confirmed: bool,
    pub timeframe: Option<Timeframe>,
    pub pattern_name: String,
    /// Set when the confirmation came from a candle pattern rather than a model.
    pub candle: Option<CandlePattern>,
    pub refined_entry: Option<f64>,
    pub refined_stop: Option<f64>,
}

impl ConfirmationResult {
    pub fn unconfirmed() -> Self {
        Self {
            confirmed: false,
            timeframe: None,
            pattern_name: "Wait/Limit D1".to_string(),
            candle: None,
            refined_entry: None,
            refined_stop: None,
        }
    }

    /// Timeframe label for reports; `1D` when only the daily setup exists.
    pub fn timeframe_label(&self) -> &'static str {
        match self.timeframe {
            Some(tf) if self.confirmed => tf.as_str(),
            _ => Timeframe::D1.as_str(),
        }
    }
}
