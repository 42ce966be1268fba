//! Risk-based position sizing with lot flooring.

use serde::{Deserialize, Serialize};

/// Sizing parameters.
///
/// # Formula
/// ```text
/// by_risk    = balance * risk_pct / (|entry - stop| * price_multiplier)
/// by_capital = balance * max_position_pct / (entry * price_multiplier)
/// quantity   = floor(min(by_risk, by_capital) / lot_size) * lot_size
/// ```
///
/// `price_multiplier` converts quoted prices into currency (1000 when prices
/// are quoted in thousands).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingRules {
    pub risk_pct: f64,
    pub max_position_pct: f64,
    pub lot_size: f64,
    pub price_multiplier: f64,
}

impl SizingRules {
    /// 2% risk, 25% of balance per position, lots of 10.
    pub fn backtest() -> Self {
        Self {
            risk_pct: 0.02,
            max_position_pct: 0.25,
            lot_size: 10.0,
            price_multiplier: 1.0,
        }
    }

    /// 1% risk over five positions, lots of 100, prices in thousands.
    pub fn live() -> Self {
        Self {
            risk_pct: 0.01,
            max_position_pct: 0.2,
            lot_size: 100.0,
            price_multiplier: 1000.0,
        }
    }
}

impl Default for SizingRules {
    fn default() -> Self {
        Self::backtest()
    }
}

/// Quantity for a trade from `entry` with protective `stop`.
///
/// `None` when the geometry is degenerate or the result is below one lot.
pub fn position_size(rules: &SizingRules, balance: f64, entry: f64, stop: f64) -> Option<f64> {
    let spread = (entry - stop).abs() * rules.price_multiplier;
    let notional = entry * rules.price_multiplier;
    if !(spread > 0.0 && notional > 0.0 && balance > 0.0 && rules.lot_size > 0.0) {
        return None;
    }
    let by_risk = balance * rules.risk_pct / spread;
    let by_capital = balance * rules.max_position_pct / notional;
    let lots = (by_risk.min(by_capital) / rules.lot_size).floor();
    (lots >= 1.0).then(|| lots * rules.lot_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_bound_applies() {
        // 2% of 1e9 over a 1000 spread = 20_000 units; capital cap 25e7 / 10_000 = 25_000
        let qty = position_size(&SizingRules::backtest(), 1e9, 10_000.0, 9_000.0).unwrap();
        assert_eq!(qty, 20_000.0);
    }

    #[test]
    fn capital_cap_applies() {
        // risk allows 20_000 units at 50_000 each; the 25% cap allows 5_000
        let qty = position_size(&SizingRules::backtest(), 1e9, 50_000.0, 49_000.0).unwrap();
        assert_eq!(qty, 5_000.0);
        assert!(qty * 50_000.0 <= 0.25 * 1e9);
    }

    #[test]
    fn floors_to_lot() {
        let qty = position_size(&SizingRules::backtest(), 10_000.0, 10.0, 9.0).unwrap();
        // 200 by risk, 250 by capital
        assert_eq!(qty, 200.0);
        let qty = position_size(&SizingRules::backtest(), 10_000.0, 10.0, 8.7).unwrap();
        // 153.8 by risk -> 150
        assert_eq!(qty, 150.0);
    }

    #[test]
    fn below_one_lot_is_skipped() {
        assert_eq!(position_size(&SizingRules::backtest(), 100.0, 10.0, 9.0), None);
    }

    #[test]
    fn zero_risk_is_skipped() {
        assert_eq!(position_size(&SizingRules::backtest(), 1e9, 10.0, 10.0), None);
    }

    #[test]
    fn live_rules_use_price_multiplier() {
        // 1e7 risk / (2 * 1000) = 5000; 2e8 / (50 * 1000) = 4000 -> 4000
        let qty = position_size(&SizingRules::live(), 1e9, 50.0, 48.0).unwrap();
        assert_eq!(qty, 4_000.0);
    }
}
