//! Backtest summary — pure functions over the trade journal and balance ledger.
//!
//! Every metric is a pure function: trades and/or balance curve in, scalar out.
//! No dependencies on the scanner, data pipeline, or simulator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sniperlab_core::domain::{LedgerEntry, Trade, TradeState};
use sniperlab_core::simulate::BacktestResult;

/// Aggregate statistics for one backtest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub trade_count: usize,
    pub closed: usize,
    pub open: usize,
    pub tp: usize,
    pub be: usize,
    pub sl: usize,
    pub time_exit: usize,
    /// TP share of closed trades.
    pub win_rate: f64,
    /// TP plus BE share of closed trades.
    pub not_loss_rate: f64,
    pub net_profit: f64,
    /// Net profit over the initial balance.
    pub roi: f64,
    pub avg_hold_days: f64,
    pub avg_r_multiple: f64,
    /// Negative fraction of the running peak (-0.15 = 15% drawdown).
    pub max_drawdown: f64,
    pub profit_factor: f64,
    pub skipped_capacity: usize,
    pub skipped_size: usize,
    /// Per model, best net PnL first.
    pub models: Vec<ModelStats>,
}

impl BacktestSummary {
    pub fn compute(result: &BacktestResult) -> Self {
        let trades = &result.trades;
        let closed: Vec<&Trade> = trades.iter().filter(|t| t.state.is_closed()).collect();
        let net_profit = result.final_balance - result.initial_balance;
        Self {
            trade_count: trades.len(),
            closed: closed.len(),
            open: trades.len() - closed.len(),
            tp: count_state(trades, TradeState::Tp),
            be: count_state(trades, TradeState::Be),
            sl: count_state(trades, TradeState::Sl),
            time_exit: count_state(trades, TradeState::TimeExit),
            win_rate: win_rate(trades),
            not_loss_rate: not_loss_rate(trades),
            net_profit,
            roi: if result.initial_balance > 0.0 {
                net_profit / result.initial_balance
            } else {
                0.0
            },
            avg_hold_days: avg_hold_days(trades),
            avg_r_multiple: avg_r_multiple(trades),
            max_drawdown: max_drawdown(&balance_curve(result.initial_balance, &result.ledger)),
            profit_factor: profit_factor(trades),
            skipped_capacity: result.skipped_capacity,
            skipped_size: result.skipped_size,
            models: model_breakdown(trades),
        }
    }
}

/// Outcome counts and rates for trades opened by one entry model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    pub model: String,
    pub trades: usize,
    pub tp: usize,
    pub be: usize,
    pub sl: usize,
    pub time_exit: usize,
    pub net_pnl: f64,
    pub avg_score: f64,
    /// Share of trades confirmed on a lower timeframe.
    pub confirmation_rate: f64,
    pub win_rate: f64,
    pub not_loss_rate: f64,
}

// ─── Individual metric functions ────────────────────────────────────

pub fn count_state(trades: &[Trade], state: TradeState) -> usize {
    trades.iter().filter(|t| t.state == state).count()
}

/// TP exits over closed trades.
pub fn win_rate(trades: &[Trade]) -> f64 {
    let closed = trades.iter().filter(|t| t.state.is_closed()).count();
    if closed == 0 {
        return 0.0;
    }
    count_state(trades, TradeState::Tp) as f64 / closed as f64
}

/// TP and BE exits over closed trades.
pub fn not_loss_rate(trades: &[Trade]) -> f64 {
    let closed = trades.iter().filter(|t| t.state.is_closed()).count();
    if closed == 0 {
        return 0.0;
    }
    let kept = count_state(trades, TradeState::Tp) + count_state(trades, TradeState::Be);
    kept as f64 / closed as f64
}

/// Mean calendar days held, over trades with an exit.
pub fn avg_hold_days(trades: &[Trade]) -> f64 {
    let days: Vec<f64> = trades
        .iter()
        .filter(|t| t.state.is_closed())
        .filter_map(Trade::hold_days)
        .map(|d| d as f64)
        .collect();
    mean_f64(&days)
}

pub fn avg_r_multiple(trades: &[Trade]) -> f64 {
    let rs: Vec<f64> = trades
        .iter()
        .filter(|t| t.state.is_closed())
        .map(Trade::r_multiple)
        .collect();
    mean_f64(&rs)
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if the balance never falls below a prior peak.
pub fn max_drawdown(balances: &[f64]) -> f64 {
    if balances.len() < 2 {
        return 0.0;
    }
    let mut peak = balances[0];
    let mut max_dd = 0.0_f64;

    for &balance in balances {
        if balance > peak {
            peak = balance;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((balance - peak) / peak);
        }
    }
    max_dd
}

/// Per-model statistics, best net PnL first.
pub fn model_breakdown(trades: &[Trade]) -> Vec<ModelStats> {
    let mut groups: BTreeMap<&str, Vec<Trade>> = BTreeMap::new();
    for trade in trades {
        groups.entry(trade.model.as_str()).or_default().push(trade.clone());
    }

    let mut stats: Vec<ModelStats> = groups
        .into_iter()
        .map(|(model, owned)| {
            let n = owned.len();
            ModelStats {
                model: model.to_string(),
                trades: n,
                tp: count_state(&owned, TradeState::Tp),
                be: count_state(&owned, TradeState::Be),
                sl: count_state(&owned, TradeState::Sl),
                time_exit: count_state(&owned, TradeState::TimeExit),
                net_pnl: owned.iter().map(|t| t.pnl).sum(),
                avg_score: mean_f64(&owned.iter().map(|t| t.score).collect::<Vec<_>>()),
                confirmation_rate: owned.iter().filter(|t| t.confirmed).count() as f64 / n as f64,
                win_rate: win_rate(&owned),
                not_loss_rate: not_loss_rate(&owned),
            }
        })
        .collect();
    stats.sort_by(|a, b| {
        b.net_pnl
            .total_cmp(&a.net_pnl)
            .then_with(|| a.model.cmp(&b.model))
    });
    stats
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Initial balance followed by the balance after each ledger entry.
pub fn balance_curve(initial_balance: f64, ledger: &[LedgerEntry]) -> Vec<f64> {
    std::iter::once(initial_balance)
        .chain(ledger.iter().map(|e| e.balance))
        .collect()
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use sniperlab_core::domain::Direction;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn make_trade(model: &str, state: TradeState, pnl: f64) -> Trade {
        let exit_price = match state {
            TradeState::Tp => Some(110.0),
            TradeState::Sl => Some(95.0),
            TradeState::Be | TradeState::TimeExit => Some(100.0),
            TradeState::Open => None,
        };
        Trade {
            symbol: "FPT".into(),
            side: Direction::Buy,
            entry_time: at(1),
            entry_price: 100.0,
            stop_loss: 95.0,
            take_profit: 110.0,
            state,
            exit_time: exit_price.map(|_| at(6)),
            exit_price,
            quantity: 100.0,
            fee: 0.0,
            pnl,
            score: 3.0,
            model: model.into(),
            confirmed: state == TradeState::Tp,
            confirmation_timeframe: "15m".into(),
        }
    }

    fn sample() -> Vec<Trade> {
        vec![
            make_trade("Unicorn", TradeState::Tp, 1_000.0),
            make_trade("Unicorn", TradeState::Sl, -500.0),
            make_trade("MSS+FVG", TradeState::Be, 0.0),
            make_trade("MSS+FVG", TradeState::TimeExit, 20.0),
            make_trade("MSS+FVG", TradeState::Open, 0.0),
        ]
    }

    #[test]
    fn rates_count_closed_trades_only() {
        let trades = sample();
        assert_eq!(win_rate(&trades), 0.25);
        assert_eq!(not_loss_rate(&trades), 0.5);
    }

    #[test]
    fn rates_empty() {
        assert_eq!(win_rate(&[]), 0.0);
        assert_eq!(not_loss_rate(&[]), 0.0);
        assert_eq!(avg_hold_days(&[]), 0.0);
    }

    #[test]
    fn hold_days_and_r() {
        let trades = sample();
        assert_eq!(avg_hold_days(&trades), 5.0);
        // +2R, -1R, 0, 0
        assert!((avg_r_multiple(&trades) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn profit_factor_known() {
        assert!((profit_factor(&sample()) - 1_020.0 / 500.0).abs() < 1e-12);
    }

    #[test]
    fn profit_factor_all_winners_capped() {
        let trades = vec![make_trade("A", TradeState::Tp, 10.0)];
        assert_eq!(profit_factor(&trades), 100.0);
    }

    #[test]
    fn max_drawdown_known() {
        let curve = vec![100.0, 120.0, 90.0, 130.0];
        assert!((max_drawdown(&curve) - (-0.25)).abs() < 1e-12);
    }

    #[test]
    fn max_drawdown_monotonic_is_zero() {
        assert_eq!(max_drawdown(&[100.0, 101.0, 105.0]), 0.0);
        assert_eq!(max_drawdown(&[100.0]), 0.0);
    }

    #[test]
    fn balance_curve_prepends_initial() {
        let ledger = vec![
            LedgerEntry {
                time: at(2),
                symbol: "FPT".into(),
                pnl: 50.0,
                balance: 1_050.0,
            },
            LedgerEntry {
                time: at(3),
                symbol: "VNM".into(),
                pnl: -100.0,
                balance: 950.0,
            },
        ];
        assert_eq!(balance_curve(1_000.0, &ledger), vec![1_000.0, 1_050.0, 950.0]);
    }

    #[test]
    fn model_breakdown_sorted_by_pnl() {
        let stats = model_breakdown(&sample());
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].model, "Unicorn");
        assert_eq!(stats[0].trades, 2);
        assert_eq!(stats[0].net_pnl, 500.0);
        assert_eq!(stats[0].win_rate, 0.5);
        assert_eq!(stats[0].confirmation_rate, 0.5);
        assert_eq!(stats[1].model, "MSS+FVG");
        assert_eq!(stats[1].win_rate, 0.0);
        assert_eq!(stats[1].not_loss_rate, 0.5);
    }

    #[test]
    fn summary_from_result() {
        let result = BacktestResult {
            trades: sample(),
            ledger: Vec::new(),
            initial_balance: 1_000_000.0,
            final_balance: 1_000_520.0,
            skipped_capacity: 2,
            skipped_size: 1,
        };
        let summary = BacktestSummary::compute(&result);
        assert_eq!(summary.trade_count, 5);
        assert_eq!((summary.closed, summary.open), (4, 1));
        assert_eq!((summary.tp, summary.be, summary.sl, summary.time_exit), (1, 1, 1, 1));
        assert_eq!(summary.net_profit, 520.0);
        assert!((summary.roi - 0.00052).abs() < 1e-12);
        assert_eq!(summary.skipped_capacity, 2);
        assert_eq!(summary.models.len(), 2);
    }
}
