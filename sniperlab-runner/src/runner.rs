//! Backtest runner — wires together the scanner, trade replay and metrics.
//!
//! Each symbol is replayed independently (in parallel): every bar in the
//! replay window is scanned with only the bars up to it, and each signal
//! becomes an unsized candidate trade. The candidates of all symbols are
//! then merged chronologically against one shared portfolio.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use rayon::prelude::*;
use sniperlab_core::confirm::LowerTimeframeSource;
use sniperlab_core::domain::{Series, Trade};
use sniperlab_core::simulate::{candidate_trade, merge_candidates, BacktestResult, TradeMeta, TradePlan};

use crate::config::{fingerprint, BacktestConfig, ConfigError, RunId};
use crate::data_loader::{BarStore, LoadError};
use crate::metrics::BacktestSummary;
use crate::scanner::{pair_until, ScanContext, Scanner};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("symbol '{0}' not found in loaded data")]
    SymbolNotFound(String),
    #[error("no symbols to run")]
    NoSymbols,
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one portfolio backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub symbols: Vec<String>,
    pub config: BacktestConfig,
    pub signal_count: usize,
    pub candidate_count: usize,
    /// Scan rejections over all replayed bars, by kind.
    pub rejections: BTreeMap<String, usize>,
    pub summary: BacktestSummary,
    pub result: BacktestResult,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// What replaying one symbol produced before the portfolio merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolReplay {
    pub candidates: Vec<Trade>,
    pub signals: usize,
    pub rejections: BTreeMap<String, usize>,
}

impl SymbolReplay {
    fn absorb(mut self, other: SymbolReplay) -> Self {
        self.candidates.extend(other.candidates);
        self.signals += other.signals;
        for (kind, count) in other.rejections {
            *self.rejections.entry(kind).or_default() += count;
        }
        self
    }
}

/// Index of the first bar that may produce a signal.
///
/// Signals need `warmup_bars` of history and come only from the last
/// `window_bars` bars.
pub fn replay_start(len: usize, config: &BacktestConfig) -> usize {
    config
        .replay
        .warmup_bars
        .saturating_sub(1)
        .max(len.saturating_sub(config.replay.window_bars))
}

/// Scan every bar of `series` in the replay window and simulate each signal.
///
/// The scan at bar `i` sees `bars[..=i]`, the pair cut at the same time and
/// lower-timeframe bars up to that session. The last bar is never a signal
/// bar: entries happen on the next bar.
pub fn replay_symbol(
    scanner: &Scanner,
    series: &Series,
    pair: Option<&Series>,
    lower: Option<&dyn LowerTimeframeSource>,
    config: &BacktestConfig,
) -> SymbolReplay {
    let symbol = series.symbol();
    let bars = series.bars();
    let mut replay = SymbolReplay::default();

    for i in replay_start(bars.len(), config)..bars.len().saturating_sub(1) {
        let ctx = ScanContext {
            pair: pair.map(|p| pair_until(p.bars(), bars[i].timestamp)),
            lower,
            as_of: None,
        };
        let record = match scanner.scan(symbol, &bars[..=i], &ctx) {
            Ok(record) => record,
            Err(rejection) => {
                *replay
                    .rejections
                    .entry(rejection.kind().to_string())
                    .or_default() += 1;
                continue;
            }
        };
        replay.signals += 1;

        let Some(plan) = TradePlan::new(
            record.signal,
            record.entry_price,
            record.stop_loss,
            record.nearest_target(),
            &config.exit,
        ) else {
            continue;
        };
        let meta = TradeMeta {
            score: record.score,
            model: record.model_name,
            confirmed: record.confirmed,
            confirmation_timeframe: record.confirmation_timeframe,
        };
        if let Some(trade) = candidate_trade(symbol, bars, i, &plan, &config.exit, meta) {
            replay.candidates.push(trade);
        }
    }

    debug!(
        symbol,
        signals = replay.signals,
        candidates = replay.candidates.len(),
        "symbol replayed"
    );
    replay
}

/// Run a portfolio backtest over `symbols` with a scanner built from `config.scan`.
pub fn run_backtest(
    store: &BarStore,
    symbols: &[String],
    config: &BacktestConfig,
    pair: Option<&str>,
) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let scanner = Scanner::new(config.scan.clone());
    run_backtest_with(&scanner, store, symbols, config, pair)
}

/// Run a portfolio backtest with a caller-supplied scanner.
pub fn run_backtest_with(
    scanner: &Scanner,
    store: &BarStore,
    symbols: &[String],
    config: &BacktestConfig,
    pair: Option<&str>,
) -> Result<BacktestReport, RunError> {
    if symbols.is_empty() {
        return Err(RunError::NoSymbols);
    }
    let series: Vec<&Series> = symbols
        .iter()
        .map(|s| store.daily(s).ok_or_else(|| RunError::SymbolNotFound(s.clone())))
        .collect::<Result<_, _>>()?;
    let pair_series = match pair {
        Some(p) => Some(store.daily(p).ok_or_else(|| RunError::SymbolNotFound(p.to_string()))?),
        None => None,
    };

    info!(symbols = symbols.len(), "replaying symbols");
    let replay = series
        .par_iter()
        .map(|s| replay_symbol(scanner, s, pair_series, Some(store), config))
        .reduce(SymbolReplay::default, SymbolReplay::absorb);

    let candidate_count = replay.candidates.len();
    let result = merge_candidates(replay.candidates, &config.portfolio);
    let summary = BacktestSummary::compute(&result);
    info!(
        signals = replay.signals,
        candidates = candidate_count,
        trades = result.trades.len(),
        final_balance = result.final_balance,
        "backtest complete"
    );

    Ok(BacktestReport {
        schema_version: SCHEMA_VERSION,
        run_id: fingerprint(config)?,
        dataset_hash: store.dataset_hash(),
        has_synthetic: store.has_synthetic(),
        symbols: symbols.to_vec(),
        config: config.clone(),
        signal_count: replay.signals,
        candidate_count,
        rejections: replay.rejections,
        summary,
        result,
    })
}
