//! Bar timeframes used by the scanner and the confirmer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SeriesError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1D")]
    D1,
    #[serde(rename = "1H")]
    H1,
    #[serde(rename = "15m")]
    M15,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::D1 => "1D",
            Timeframe::H1 => "1H",
            Timeframe::M15 => "15m",
        }
    }

    pub fn is_intraday(&self) -> bool {
        !matches!(self, Timeframe::D1)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1D" | "1d" | "D1" => Ok(Timeframe::D1),
            "1H" | "1h" | "H1" => Ok(Timeframe::H1),
            "15m" | "15M" | "M15" => Ok(Timeframe::M15),
            other => Err(SeriesError::UnknownTimeframe(other.to_string())),
        }
    }
}
