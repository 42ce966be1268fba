//! Portfolio — balance, the set of trades still open, and the settled journal.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Trade;

/// One realized balance change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub time: NaiveDateTime,
    pub symbol: String,
    pub pnl: f64,
    pub balance: f64,
}

/// Aggregate portfolio state for the chronological merge.
///
/// A trade stays in the open set until a later admission sees its exit time
/// at or before the new entry; its PnL is credited to the balance then.
/// Trades that never exit (still open at the end of data) keep their slot.
#[derive(Debug, Clone)]
pub struct Portfolio {
    initial_balance: f64,
    balance: f64,
    max_concurrent: usize,
    /// Indices into `journal`.
    open: Vec<usize>,
    journal: Vec<Trade>,
    ledger: Vec<LedgerEntry>,
}

impl Portfolio {
    pub fn new(initial_balance: f64, max_concurrent: usize) -> Self {
        Self {
            initial_balance,
            balance: initial_balance,
            max_concurrent,
            open: Vec::new(),
            journal: Vec::new(),
            ledger: Vec::new(),
        }
    }

    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn has_capacity(&self) -> bool {
        self.open.len() < self.max_concurrent
    }

    pub fn journal(&self) -> &[Trade] {
        &self.journal
    }

    pub fn ledger(&self) -> &[LedgerEntry] {
        &self.ledger
    }

    /// Credit every open trade whose exit is at or before `time`.
    pub fn settle_until(&mut self, time: NaiveDateTime) {
        self.settle_where(|exit| exit <= time);
    }

    /// Add a sized trade to the book. Callers check [`has_capacity`](Self::has_capacity) first.
    pub fn admit(&mut self, trade: Trade) {
        self.journal.push(trade);
        self.open.push(self.journal.len() - 1);
    }

    /// Settle everything that has an exit and hand back the journal and ledger.
    pub fn finish(mut self) -> (Vec<Trade>, Vec<LedgerEntry>, f64) {
        self.settle_where(|_| true);
        (self.journal, self.ledger, self.balance)
    }

    fn settle_where(&mut self, due: impl Fn(NaiveDateTime) -> bool) {
        let mut settled: Vec<usize> = self
            .open
            .iter()
            .copied()
            .filter(|&idx| {
                let t = &self.journal[idx];
                t.state.is_closed() && t.exit_time.is_some_and(&due)
            })
            .collect();
        if settled.is_empty() {
            return;
        }
        settled.sort_by_key(|&idx| (self.journal[idx].exit_time, idx));
        for idx in &settled {
            let trade = &self.journal[*idx];
            self.balance += trade.pnl;
            self.ledger.push(LedgerEntry {
                time: trade.exit_time.unwrap_or(trade.entry_time),
                symbol: trade.symbol.clone(),
                pnl: trade.pnl,
                balance: self.balance,
            });
        }
        self.open.retain(|idx| !settled.contains(idx));
    }
}
