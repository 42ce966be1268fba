//! Zones — price bands produced by the detectors and the entry models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which detector (or model) produced the band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneKind {
    Fvg,
    OrderBlock,
    Breaker,
    /// Intersection of two zones (OB with FVG, or a balanced price range).
    Overlap,
    /// Fibonacci retracement band of an impulse leg.
    Retracement,
    /// Full range of a single bar.
    Range,
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ZoneKind::Fvg => "FVG",
            ZoneKind::OrderBlock => "OB",
            ZoneKind::Breaker => "BB",
            ZoneKind::Overlap => "OVERLAP",
            ZoneKind::Retracement => "OTE",
            ZoneKind::Range => "RANGE",
        };
        f.write_str(s)
    }
}

/// Demand (bull) or supply (bear).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneSide {
    Bull,
    Bear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strength {
    #[default]
    Normal,
    Strong,
}

impl Strength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strength::Normal => "NORMAL",
            Strength::Strong => "STRONG",
        }
    }
}

/// A price band with `lower < upper`, guaranteed by [`Zone::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub kind: ZoneKind,
    pub side: ZoneSide,
    lower: f64,
    upper: f64,
    /// Index of the bar the zone is anchored to.
    pub origin_index: usize,
    /// Names of moving averages sitting inside the band.
    pub confluence: Vec<String>,
    pub strength: Strength,
}

impl Zone {
    /// Returns `None` unless both bounds are finite and `lower < upper`.
    pub fn new(
        kind: ZoneKind,
        side: ZoneSide,
        lower: f64,
        upper: f64,
        origin_index: usize,
    ) -> Option<Self> {
        if !lower.is_finite() || !upper.is_finite() || lower >= upper {
            return None;
        }
        Some(Self {
            kind,
            side,
            lower,
            upper,
            origin_index,
            confluence: Vec::new(),
            strength: Strength::Normal,
        })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn midpoint(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }

    pub fn height(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.lower && price <= self.upper
    }

    /// Intersection of two bands, if it has positive height.
    pub fn overlap(&self, other: &Zone) -> Option<(f64, f64)> {
        let lo = self.lower.max(other.lower);
        let hi = self.upper.min(other.upper);
        (lo < hi).then_some((lo, hi))
    }

    /// Display label, e.g. `FVG` or `OB + S20,E50`.
    pub fn label(&self) -> String {
        if self.confluence.is_empty() {
            return self.kind.to_string();
        }
        let short: Vec<String> = self
            .confluence
            .iter()
            .map(|name| name.replace("SMA_", "S").replace("EMA_", "E"))
            .collect();
        format!("{} + {}", self.kind, short.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_or_flat_bounds() {
        assert!(Zone::new(ZoneKind::Fvg, ZoneSide::Bull, 10.0, 10.0, 0).is_none());
        assert!(Zone::new(ZoneKind::Fvg, ZoneSide::Bull, 11.0, 10.0, 0).is_none());
        assert!(Zone::new(ZoneKind::Fvg, ZoneSide::Bull, f64::NAN, 10.0, 0).is_none());
    }

    #[test]
    fn geometry_helpers() {
        let z = Zone::new(ZoneKind::OrderBlock, ZoneSide::Bear, 10.0, 14.0, 3).unwrap();
        assert_eq!(z.midpoint(), 12.0);
        assert_eq!(z.height(), 4.0);
        assert!(z.contains(10.0) && z.contains(14.0));
        assert!(!z.contains(14.01));
    }

    #[test]
    fn overlap_requires_positive_height() {
        let a = Zone::new(ZoneKind::OrderBlock, ZoneSide::Bull, 10.0, 14.0, 0).unwrap();
        let b = Zone::new(ZoneKind::Fvg, ZoneSide::Bull, 12.0, 20.0, 0).unwrap();
        let c = Zone::new(ZoneKind::Fvg, ZoneSide::Bull, 14.0, 20.0, 0).unwrap();
        assert_eq!(a.overlap(&b), Some((12.0, 14.0)));
        assert_eq!(a.overlap(&c), None);
    }

    #[test]
    fn label_shortens_moving_average_names() {
        let mut z = Zone::new(ZoneKind::OrderBlock, ZoneSide::Bull, 10.0, 14.0, 0).unwrap();
        assert_eq!(z.label(), "OB");
        z.confluence = vec!["SMA_20".into(), "EMA_50".into()];
        assert_eq!(z.label(), "OB + S20,E50");
    }
}
