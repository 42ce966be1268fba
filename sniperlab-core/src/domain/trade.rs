//! Trade — one simulated position from entry to exit, with research metadata.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Direction;

/// Lifecycle state. `Open` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeState {
    Open,
    Tp,
    Sl,
    Be,
    TimeExit,
}

impl TradeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeState::Open => "OPEN",
            TradeState::Tp => "TP",
            TradeState::Sl => "SL",
            TradeState::Be => "BE",
            TradeState::TimeExit => "TIME_EXIT",
        }
    }

    pub fn is_closed(&self) -> bool {
        !matches!(self, TradeState::Open)
    }
}

impl fmt::Display for TradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Identification ──
    pub symbol: String,
    pub side: Direction,

    // ── Entry ──
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,

    // ── Exit ──
    pub state: TradeState,
    pub exit_time: Option<NaiveDateTime>,
    pub exit_price: Option<f64>,

    // ── Size and result ──
    pub quantity: f64,
    pub fee: f64,
    pub pnl: f64,

    // ── Research metadata ──
    pub score: f64,
    pub model: String,
    pub confirmed: bool,
    pub confirmation_timeframe: String,
}

impl Trade {
    /// Price distance between entry and the initial stop.
    pub fn risk_per_unit(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }

    /// Signed price move captured per unit, zero while open.
    pub fn points(&self) -> f64 {
        match self.exit_price {
            Some(exit) if self.state.is_closed() => self.side.sign() * (exit - self.entry_price),
            _ => 0.0,
        }
    }

    /// Result in multiples of the initial risk.
    pub fn r_multiple(&self) -> f64 {
        let risk = self.risk_per_unit();
        if risk == 0.0 {
            return 0.0;
        }
        self.points() / risk
    }

    /// Calendar days between entry and exit.
    pub fn hold_days(&self) -> Option<i64> {
        self.exit_time.map(|exit| (exit - self.entry_time).num_days())
    }

    pub fn is_winner(&self) -> bool {
        self.state == TradeState::Tp
    }
}
