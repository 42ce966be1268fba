//! Trade lifecycle replay and the chronological portfolio merge.
//!
//! Exits are resolved per symbol by [`simulate_exit`], which only reads bars
//! after the signal bar. [`merge_candidates`] then walks every candidate in
//! entry order, applying the concurrency cap and sizing from the balance
//! realized so far.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Direction, LedgerEntry, Portfolio, Trade, TradeState};
use crate::sizing::{position_size, SizingRules};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitRules {
    /// Move the stop to entry once price reaches this many R in favor.
    pub break_even_r: f64,
    /// Bars after the signal bar before a TIME_EXIT at the close.
    pub max_hold_bars: usize,
    /// Targets closer than this many R are pushed out to it.
    pub min_target_r: f64,
    /// Bars after the signal bar during which exits are not evaluated.
    pub min_hold_bars: usize,
}

impl Default for ExitRules {
    fn default() -> Self {
        Self {
            break_even_r: 1.2,
            max_hold_bars: 45,
            min_target_r: 1.5,
            min_hold_bars: 0,
        }
    }
}

/// Target at least `min_r` R away from entry in the trade's favor.
pub fn floor_target(
    direction: Direction,
    entry: f64,
    stop: f64,
    candidate: Option<f64>,
    min_r: f64,
) -> f64 {
    let floor = entry + direction.sign() * min_r * (entry - stop).abs();
    match (direction, candidate) {
        (Direction::Buy, Some(tp)) => tp.max(floor),
        (Direction::Sell, Some(tp)) => tp.min(floor),
        (_, None) => floor,
    }
}

/// Entry, stop and target of a candidate trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub direction: Direction,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
}

impl TradePlan {
    /// `None` unless the stop sits on the losing side of the entry.
    pub fn new(
        direction: Direction,
        entry: f64,
        stop: f64,
        nearest_target: Option<f64>,
        rules: &ExitRules,
    ) -> Option<Self> {
        let risk = direction.sign() * (entry - stop);
        if !(risk > 0.0 && entry.is_finite()) {
            return None;
        }
        Some(Self {
            direction,
            entry,
            stop,
            target: floor_target(direction, entry, stop, nearest_target, rules.min_target_r),
        })
    }

    pub fn risk(&self) -> f64 {
        (self.entry - self.stop).abs()
    }

    pub fn break_even_trigger(&self, rules: &ExitRules) -> f64 {
        self.entry + self.direction.sign() * rules.break_even_r * self.risk()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub state: TradeState,
    pub exit_index: Option<usize>,
    pub exit_price: Option<f64>,
}

impl TradeOutcome {
    fn open() -> Self {
        Self {
            state: TradeState::Open,
            exit_index: None,
            exit_price: None,
        }
    }

    fn closed(state: TradeState, index: usize, price: f64) -> Self {
        Self {
            state,
            exit_index: Some(index),
            exit_price: Some(price),
        }
    }
}

/// Step forward from the bar after `signal_index` until the trade resolves.
///
/// Per bar: the break-even shift is applied first, then the stop is checked,
/// then the target. A bar that touches both stop and target is a stop-out.
/// After `max_hold_bars` the trade leaves at that bar's close. Running out of
/// bars leaves it `Open`.
pub fn simulate_exit(
    bars: &[Bar],
    signal_index: usize,
    plan: &TradePlan,
    rules: &ExitRules,
) -> TradeOutcome {
    let trigger = plan.break_even_trigger(rules);
    let mut stop = plan.stop;
    let mut at_break_even = false;
    let stop_state = |be: bool| if be { TradeState::Be } else { TradeState::Sl };

    for (j, bar) in bars.iter().enumerate().skip(signal_index + 1) {
        let held = j - signal_index;
        if held <= rules.min_hold_bars {
            continue;
        }
        match plan.direction {
            Direction::Buy => {
                if !at_break_even && bar.high >= trigger {
                    stop = plan.entry;
                    at_break_even = true;
                }
                if bar.low <= stop {
                    return TradeOutcome::closed(stop_state(at_break_even), j, stop);
                }
                if bar.high >= plan.target {
                    return TradeOutcome::closed(TradeState::Tp, j, plan.target);
                }
            }
            Direction::Sell => {
                if !at_break_even && bar.low <= trigger {
                    stop = plan.entry;
                    at_break_even = true;
                }
                if bar.high >= stop {
                    return TradeOutcome::closed(stop_state(at_break_even), j, stop);
                }
                if bar.low <= plan.target {
                    return TradeOutcome::closed(TradeState::Tp, j, plan.target);
                }
            }
        }
        if held >= rules.max_hold_bars {
            return TradeOutcome::closed(TradeState::TimeExit, j, bar.close);
        }
    }
    TradeOutcome::open()
}

/// Research fields carried from the scan onto the trade.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TradeMeta {
    pub score: f64,
    pub model: String,
    pub confirmed: bool,
    pub confirmation_timeframe: String,
}

/// Unsized trade for a signal on `bars[signal_index]`, entered on the next bar.
///
/// `None` when there is no next bar.
pub fn candidate_trade(
    symbol: &str,
    bars: &[Bar],
    signal_index: usize,
    plan: &TradePlan,
    rules: &ExitRules,
    meta: TradeMeta,
) -> Option<Trade> {
    let entry_bar = bars.get(signal_index + 1)?;
    let outcome = simulate_exit(bars, signal_index, plan, rules);
    Some(Trade {
        symbol: symbol.to_string(),
        side: plan.direction,
        entry_time: entry_bar.timestamp,
        entry_price: plan.entry,
        stop_loss: plan.stop,
        take_profit: plan.target,
        state: outcome.state,
        exit_time: outcome.exit_index.map(|j| bars[j].timestamp),
        exit_price: outcome.exit_price,
        quantity: 0.0,
        fee: 0.0,
        pnl: 0.0,
        score: meta.score,
        model: meta.model,
        confirmed: meta.confirmed,
        confirmation_timeframe: meta.confirmation_timeframe,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeRules {
    pub initial_balance: f64,
    pub max_concurrent: usize,
    pub sizing: SizingRules,
    /// Charged on entry plus exit notional.
    pub fee_rate: f64,
}

impl Default for MergeRules {
    fn default() -> Self {
        Self {
            initial_balance: 1_000_000_000.0,
            max_concurrent: 5,
            sizing: SizingRules::backtest(),
            fee_rate: 0.002,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub ledger: Vec<LedgerEntry>,
    pub initial_balance: f64,
    pub final_balance: f64,
    /// Candidates dropped because the concurrency cap was full.
    pub skipped_capacity: usize,
    /// Candidates dropped because they sized below one lot.
    pub skipped_size: usize,
}

/// Admit candidates in `(entry_time, symbol)` order against one portfolio.
pub fn merge_candidates(mut candidates: Vec<Trade>, rules: &MergeRules) -> BacktestResult {
    candidates.sort_by(|a, b| {
        a.entry_time
            .cmp(&b.entry_time)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    let mut portfolio = Portfolio::new(rules.initial_balance, rules.max_concurrent);
    let (mut skipped_capacity, mut skipped_size) = (0, 0);

    for mut trade in candidates {
        portfolio.settle_until(trade.entry_time);
        if !portfolio.has_capacity() {
            skipped_capacity += 1;
            continue;
        }
        let Some(quantity) = position_size(
            &rules.sizing,
            portfolio.balance(),
            trade.entry_price,
            trade.stop_loss,
        ) else {
            skipped_size += 1;
            continue;
        };
        trade.quantity = quantity;
        if let Some(exit) = trade.exit_price.filter(|_| trade.state.is_closed()) {
            let notional = (trade.entry_price + exit) * quantity * rules.sizing.price_multiplier;
            trade.fee = notional * rules.fee_rate;
            trade.pnl = trade.points() * quantity * rules.sizing.price_multiplier - trade.fee;
        }
        portfolio.admit(trade);
    }

    let (trades, ledger, final_balance) = portfolio.finish();
    BacktestResult {
        trades,
        ledger,
        initial_balance: rules.initial_balance,
        final_balance,
        skipped_capacity,
        skipped_size,
    }
}
