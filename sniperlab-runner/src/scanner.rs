//! Single-symbol scan: daily setup, filters, confirmation, trade levels, score.
//!
//! A scan never fails. Every way a symbol can drop out is a tagged
//! [`Rejection`] carrying a human-readable reason, so batch scans can count
//! them. Only loading and config problems are errors, and those happen
//! before a scan starts.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sniperlab_core::confirm::{LowerTimeframeSource, MultiTimeframeConfirmer};
use sniperlab_core::domain::{
    Bar, CandlePattern, ConfirmationResult, Direction, ModelTier, Series, Strength, SweepKind,
    Zone, ZoneKind, ZoneSide,
};
use sniperlab_core::detect::ConfluenceAnnotator;
use sniperlab_core::indicators::{Atr, Ema, Indicator, MaSnapshot};
use sniperlab_core::models::{EntryModelAggregator, MarketContext, ModelInput, MIN_BARS};
use sniperlab_core::price_action::check_candlestick_signal;
use sniperlab_core::scoring::{score, volume_spike, ScoreInputs};
use sniperlab_core::sizing::position_size;

use crate::config::{ScanConfig, StopBuffer};
use crate::data_loader::BarStore;

/// Default target at this many R.
pub const DEFAULT_TARGET_R: f64 = 2.5;
/// Suggested break-even level in R.
pub const BREAK_EVEN_R: f64 = 1.8;
/// Added to the score when the lower timeframe agrees.
pub const CONFIRMATION_BONUS: f64 = 1.2;
/// Bars searched for the range extreme targeted after a sweep.
pub const SWEEP_TARGET_LOOKBACK: usize = 20;
/// Take-profit levels kept per record.
pub const MAX_TARGETS: usize = 3;

/// Why a symbol produced no signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum Rejection {
    InsufficientData(String),
    InvalidGeometry(String),
    NoSetup(String),
    LiquidityRejected(String),
    TrendFilterRejected(String),
    ScoreTooLow(String),
}

impl Rejection {
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::InsufficientData(_) => "insufficient_data",
            Rejection::InvalidGeometry(_) => "invalid_geometry",
            Rejection::NoSetup(_) => "no_setup",
            Rejection::LiquidityRejected(_) => "liquidity_rejected",
            Rejection::TrendFilterRejected(_) => "trend_filter_rejected",
            Rejection::ScoreTooLow(_) => "score_too_low",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Rejection::InsufficientData(r)
            | Rejection::InvalidGeometry(r)
            | Rejection::NoSetup(r)
            | Rejection::LiquidityRejected(r)
            | Rejection::TrendFilterRejected(r)
            | Rejection::ScoreTooLow(r) => r,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.reason())
    }
}

/// A tradable setup with its levels and research fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub symbol: String,
    /// Timestamp of the daily bar the setup was found on.
    pub as_of: NaiveDateTime,
    pub signal: Direction,
    pub score: f64,
    pub score_tags: Vec<String>,
    pub entry_price: f64,
    pub stop_loss: f64,
    /// Nearest first, at most three, all on the profit side of the entry.
    pub take_profit_levels: Vec<f64>,
    pub break_even_price: f64,
    pub model_name: String,
    pub confirmed: bool,
    pub confirmation_timeframe: String,
    pub confirmation_pattern: String,

    // ── Informational ──
    pub close: f64,
    /// Midpoint of the daily zone.
    pub d1_poi: Option<f64>,
    /// Daily zone label with its confluent averages, e.g. `FVG + S10,S20`.
    pub poi_label: Option<String>,
    pub poi_strength: Option<Strength>,
    /// Moving averages sitting inside the daily zone.
    pub confluence: Vec<String>,
    pub distance_to_poi_pct: f64,
    pub quantity: f64,
    pub note: String,
}

impl SignalRecord {
    pub fn risk(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }

    pub fn nearest_target(&self) -> Option<f64> {
        self.take_profit_levels.first().copied()
    }
}

pub type ScanOutcome = Result<SignalRecord, Rejection>;

/// Optional inputs beyond the daily bars.
#[derive(Clone, Copy, Default)]
pub struct ScanContext<'a> {
    /// Correlated series for SMT divergence, already cut at the scan bar.
    pub pair: Option<&'a [Bar]>,
    pub lower: Option<&'a dyn LowerTimeframeSource>,
    /// Cutoff for lower-timeframe bars; defaults to the session close of the
    /// latest daily bar.
    pub as_of: Option<NaiveDateTime>,
}

/// Daily bars carry a midnight timestamp; confirmation looks at the session
/// up to 14:30 that day. Intraday timestamps pass through.
pub fn session_as_of(timestamp: NaiveDateTime) -> NaiveDateTime {
    if timestamp.time() == chrono::NaiveTime::MIN {
        timestamp.date().and_hms_opt(14, 30, 0).unwrap_or(timestamp)
    } else {
        timestamp
    }
}

/// Prefix of `pair` with timestamps at or before `until`.
pub fn pair_until(pair: &[Bar], until: NaiveDateTime) -> &[Bar] {
    let end = pair.partition_point(|b| b.timestamp <= until);
    &pair[..end]
}

struct Setup {
    direction: Direction,
    model: String,
    tier: Option<ModelTier>,
    pattern: Option<CandlePattern>,
    zone: Option<Zone>,
    raw_stop: f64,
}

/// Scanner shared across symbols; holds the model list and the confirmer.
#[derive(Debug)]
pub struct Scanner {
    config: ScanConfig,
    aggregator: EntryModelAggregator,
    confirmer: MultiTimeframeConfirmer,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self::with_aggregator(config, EntryModelAggregator::default())
    }

    /// Daily setups come from `aggregator`; confirmation keeps the full model list.
    pub fn with_aggregator(config: ScanConfig, aggregator: EntryModelAggregator) -> Self {
        Self {
            config,
            aggregator,
            confirmer: MultiTimeframeConfirmer::default(),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn scan(&self, symbol: &str, bars: &[Bar], ctx: &ScanContext<'_>) -> ScanOutcome {
        let n = bars.len();
        if n < MIN_BARS {
            return Err(Rejection::InsufficientData(format!(
                "{n} bars, need {MIN_BARS}"
            )));
        }
        let last = &bars[n - 1];
        self.check_liquidity(bars)?;

        let mut input = ModelInput::new(bars);
        if let Some(pair) = ctx.pair {
            input = input.with_pair(pair);
        }
        let market = MarketContext::build(input);
        let setup = self
            .find_setup(&market)
            .ok_or_else(|| Rejection::NoSetup("no daily setup".into()))?;
        let direction = setup.direction;
        self.check_trend(bars, direction)?;

        let confirmation = match ctx.lower {
            Some(source) => {
                let as_of = ctx.as_of.unwrap_or_else(|| session_as_of(last.timestamp));
                self.confirmer
                    .confirm(source, symbol, direction, bars, as_of)
            }
            None => ConfirmationResult::unconfirmed(),
        };
        let confirmed = confirmation.confirmed;

        let entry = confirmation
            .refined_entry
            .filter(|_| confirmed)
            .unwrap_or(last.close);
        let stop = confirmation
            .refined_stop
            .filter(|_| confirmed)
            .unwrap_or_else(|| self.widen_stop(bars, direction, setup.raw_stop));
        let risk = direction.sign() * (entry - stop);
        if !(risk > 0.0 && risk.is_finite()) {
            return Err(Rejection::InvalidGeometry("Risk invalid".into()));
        }

        let take_profit_levels = take_profit_levels(&market, direction, entry, risk);
        let break_even_price = entry + direction.sign() * BREAK_EVEN_R * risk;

        let pattern = if confirmed {
            confirmation.candle
        } else {
            setup.pattern
        };
        let mut scored = score(&ScoreInputs {
            tier: setup.tier,
            pattern,
            volume_spike: volume_spike(bars),
            sweep: market.sweep.is_some(),
            trend_agreement: false,
        });
        if confirmed {
            scored = scored.with_bonus(CONFIRMATION_BONUS, "ltf confirmation");
        }
        if let Some(min) = self.config.min_score {
            if scored.raw_score < min {
                return Err(Rejection::ScoreTooLow(format!(
                    "score {:.1} below {min:.1}",
                    scored.raw_score
                )));
            }
        }

        let quantity = position_size(&self.config.sizing, self.config.nav, entry, stop).unwrap_or(0.0);
        let poi = setup.zone.as_ref().map(|zone| {
            ConfluenceAnnotator::default().annotate(zone, &MaSnapshot::from_bars(bars))
        });
        let d1_poi = poi.as_ref().map(Zone::midpoint);
        let distance_to_poi_pct = d1_poi
            .filter(|poi| *poi > 0.0)
            .map_or(0.0, |poi| (last.close - poi) / poi * 100.0);
        let confirmation_timeframe = confirmation.timeframe_label().to_string();
        let status = if confirmed {
            format!("Confirm {confirmation_timeframe}")
        } else {
            "D1 Only".to_string()
        };
        let note = format!(
            "{} | {:.1}% from POI | {}",
            setup.model, distance_to_poi_pct, status
        );

        Ok(SignalRecord {
            symbol: symbol.to_string(),
            as_of: last.timestamp,
            signal: direction,
            score: scored.raw_score,
            score_tags: scored.tags,
            entry_price: entry,
            stop_loss: stop,
            take_profit_levels,
            break_even_price,
            model_name: setup.model,
            confirmed,
            confirmation_timeframe,
            confirmation_pattern: confirmation.pattern_name,
            close: last.close,
            d1_poi,
            poi_label: poi.as_ref().map(Zone::label),
            poi_strength: poi.as_ref().map(|z| z.strength),
            confluence: poi.map(|z| z.confluence).unwrap_or_default(),
            distance_to_poi_pct,
            quantity,
            note,
        })
    }

    fn check_liquidity(&self, bars: &[Bar]) -> Result<(), Rejection> {
        let rules = &self.config.liquidity;
        let close = bars[bars.len() - 1].close;
        let window = &bars[bars.len().saturating_sub(rules.window)..];
        let mean_volume = window.iter().map(|b| b.volume).sum::<f64>() / window.len() as f64;
        if close <= rules.min_price {
            return Err(Rejection::LiquidityRejected(format!(
                "close {close:.2} at or below {:.2}",
                rules.min_price
            )));
        }
        if mean_volume < rules.min_volume {
            return Err(Rejection::LiquidityRejected(format!(
                "mean volume {mean_volume:.0} below {:.0}",
                rules.min_volume
            )));
        }
        if close * mean_volume < rules.min_turnover {
            return Err(Rejection::LiquidityRejected(format!(
                "turnover {:.0} below {:.0}",
                close * mean_volume,
                rules.min_turnover
            )));
        }
        Ok(())
    }

    /// Aggregator first; otherwise a daily candle pattern, BUY before SELL.
    fn find_setup(&self, market: &MarketContext<'_>) -> Option<Setup> {
        let last = market.last()?;
        if let Some(signal) = self.aggregator.evaluate_context(market, None) {
            let raw_stop = match (&signal.zone, signal.direction) {
                (Some(zone), Direction::Buy) => zone.lower(),
                (Some(zone), Direction::Sell) => zone.upper(),
                (None, Direction::Buy) => last.low,
                (None, Direction::Sell) => last.high,
            };
            return Some(Setup {
                direction: signal.direction,
                model: signal.model,
                tier: Some(signal.tier),
                pattern: None,
                zone: signal.zone,
                raw_stop,
            });
        }

        [Direction::Buy, Direction::Sell]
            .into_iter()
            .find_map(|direction| {
                let candle = check_candlestick_signal(market.bars, direction)?;
                let (lower, upper) = match direction {
                    Direction::Buy => (candle.stop_reference, last.close),
                    Direction::Sell => (last.close, candle.stop_reference),
                };
                Some(Setup {
                    direction,
                    model: candle.label(),
                    tier: None,
                    pattern: Some(candle.pattern),
                    zone: Zone::new(
                        ZoneKind::Range,
                        direction.zone_side(),
                        lower,
                        upper,
                        candle.index,
                    ),
                    raw_stop: candle.stop_reference,
                })
            })
    }

    fn check_trend(&self, bars: &[Bar], direction: Direction) -> Result<(), Rejection> {
        let period = self.config.ema_period;
        let Some(ema) = Ema::new(period).latest(bars) else {
            return Ok(());
        };
        let close = bars[bars.len() - 1].close;
        let tolerance = self.config.trend_tolerance;
        match direction {
            Direction::Buy if close <= ema * (1.0 - tolerance) => {
                Err(Rejection::TrendFilterRejected(format!(
                    "BUY with close {close:.2} under EMA{period} {ema:.2}"
                )))
            }
            Direction::Sell if close >= ema * (1.0 + tolerance) => {
                Err(Rejection::TrendFilterRejected(format!(
                    "SELL with close {close:.2} over EMA{period} {ema:.2}"
                )))
            }
            _ => Ok(()),
        }
    }

    fn widen_stop(&self, bars: &[Bar], direction: Direction, raw: f64) -> f64 {
        let offset = match self.config.stop_buffer {
            StopBuffer::Percent { pct } => raw * pct,
            StopBuffer::Atr { period, multiple } => {
                multiple * Atr::new(period).latest(bars).unwrap_or(0.0)
            }
        };
        raw - direction.sign() * offset
    }
}

/// Nearest opposing FVG and order block, the swept range extreme, and the
/// default `entry ± 2.5R`; deduplicated and sorted nearest first.
fn take_profit_levels(
    market: &MarketContext<'_>,
    direction: Direction,
    entry: f64,
    risk: f64,
) -> Vec<f64> {
    let bars = market.bars;
    let recent = &bars[bars.len().saturating_sub(SWEEP_TARGET_LOOKBACK)..];
    let mut levels = Vec::with_capacity(4);

    match direction {
        Direction::Buy => {
            levels.extend(nearest(
                market
                    .fvgs
                    .iter()
                    .filter(|z| z.side == ZoneSide::Bull && z.lower() > entry)
                    .map(Zone::upper),
                f64::min,
            ));
            levels.extend(nearest(
                market
                    .order_blocks
                    .iter()
                    .filter(|z| z.side == ZoneSide::Bear && z.lower() > entry)
                    .map(Zone::upper),
                f64::min,
            ));
            if market.sweep == Some(SweepKind::BuySide) {
                levels.push(recent.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max));
            }
        }
        Direction::Sell => {
            levels.extend(nearest(
                market
                    .fvgs
                    .iter()
                    .filter(|z| z.side == ZoneSide::Bear && z.upper() < entry)
                    .map(Zone::lower),
                f64::max,
            ));
            levels.extend(nearest(
                market
                    .order_blocks
                    .iter()
                    .filter(|z| z.side == ZoneSide::Bull && z.upper() < entry)
                    .map(Zone::lower),
                f64::max,
            ));
            if market.sweep == Some(SweepKind::SellSide) {
                levels.push(recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min));
            }
        }
    }
    levels.push(entry + direction.sign() * DEFAULT_TARGET_R * risk);

    let sign = direction.sign();
    levels.retain(|level| level.is_finite() && sign * (level - entry) > 0.0);
    levels.sort_by(|a, b| (sign * a).total_cmp(&(sign * b)));
    levels.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    levels.truncate(MAX_TARGETS);
    levels
}

fn nearest(values: impl Iterator<Item = f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    values.reduce(pick)
}

/// Scan one series with a fresh scanner.
pub fn scan_symbol(series: &Series, ctx: &ScanContext<'_>, config: &ScanConfig) -> ScanOutcome {
    Scanner::new(config.clone()).scan(series.symbol(), series.bars(), ctx)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedSymbol {
    pub symbol: String,
    pub rejection: Rejection,
}

/// Batch result: records best first, plus rejection counts by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub records: Vec<SignalRecord>,
    pub rejections: BTreeMap<String, usize>,
    pub rejected: Vec<RejectedSymbol>,
}

impl ScanReport {
    pub fn from_outcomes(outcomes: Vec<(String, ScanOutcome)>) -> Self {
        let mut report = Self::default();
        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(record) => report.records.push(record),
                Err(rejection) => {
                    *report
                        .rejections
                        .entry(rejection.kind().to_string())
                        .or_default() += 1;
                    report.rejected.push(RejectedSymbol { symbol, rejection });
                }
            }
        }
        report.records.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        report.rejected.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        report
    }

    pub fn total(&self) -> usize {
        self.records.len() + self.rejected.len()
    }
}

/// Scan `symbols` in parallel against the daily bars in `store`.
///
/// Intraday files in the store are used for confirmation; `pair` names a
/// correlated daily series for SMT.
pub fn scan_batch(
    scanner: &Scanner,
    store: &BarStore,
    symbols: &[String],
    pair: Option<&str>,
) -> ScanReport {
    let pair_series = pair.and_then(|p| store.daily(p));
    let outcomes: Vec<(String, ScanOutcome)> = symbols
        .par_iter()
        .map(|symbol| {
            let outcome = match store.daily(symbol) {
                Some(series) => {
                    let until = series.last().map(|b| b.timestamp);
                    let ctx = ScanContext {
                        pair: pair_series
                            .zip(until)
                            .map(|(p, until)| pair_until(p.bars(), until)),
                        lower: Some(store),
                        as_of: None,
                    };
                    scanner.scan(symbol, series.bars(), &ctx)
                }
                None => Err(Rejection::InsufficientData("no daily data".into())),
            };
            if let Err(rejection) = &outcome {
                debug!(symbol = %symbol, %rejection, "rejected");
            }
            (symbol.clone(), outcome)
        })
        .collect();

    let report = ScanReport::from_outcomes(outcomes);
    info!(
        symbols = symbols.len(),
        signals = report.records.len(),
        rejected = report.rejected.len(),
        "scan complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sniperlab_core::domain::{EntrySignal, Timeframe};
    use sniperlab_core::models::EntryModel;

    fn day(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::days(i as i64)
    }

    /// Closes step by `step` from `start`; every bar closes in the step's direction.
    fn trending(n: usize, start: f64, step: f64, volume: f64) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let close = start + step * i as f64;
                let open = close - step.signum() * 0.3;
                let high = open.max(close) + 0.5;
                let low = open.min(close) - 0.5;
                Bar::new(day(i), open, high, low, close, volume)
            })
            .collect()
    }

    /// Flat bars ending in a high-volume bullish engulfing candle.
    fn engulfing_daily() -> Vec<Bar> {
        let mut bars: Vec<Bar> = (0..80)
            .map(|i| Bar::new(day(i), 100.0, 101.0, 99.0, 100.0, 1_000_000.0))
            .collect();
        bars[78] = Bar::new(day(78), 100.5, 101.0, 99.5, 99.8, 1_000_000.0);
        bars[79] = Bar::new(day(79), 99.6, 101.2, 99.4, 101.0, 3_000_000.0);
        bars
    }

    /// Fires every time with a zone at `last.close + offsets`.
    struct Always(Direction, f64, f64);

    impl EntryModel for Always {
        fn name(&self) -> &'static str {
            "Always"
        }

        fn tier(&self) -> ModelTier {
            ModelTier::Basic
        }

        fn evaluate(&self, ctx: &MarketContext<'_>) -> Option<EntrySignal> {
            let close = ctx.last()?.close;
            let zone = Zone::new(
                ZoneKind::Fvg,
                self.0.zone_side(),
                close + self.1,
                close + self.2,
                ctx.bars.len() - 3,
            );
            Some(EntrySignal::new(self.0, "Always", ModelTier::Basic, zone))
        }
    }

    fn always(config: ScanConfig, direction: Direction, lo: f64, hi: f64) -> Scanner {
        Scanner::with_aggregator(
            config,
            EntryModelAggregator::with_models(vec![Box::new(Always(direction, lo, hi))]),
        )
    }

    fn scan(scanner: &Scanner, bars: &[Bar]) -> ScanOutcome {
        scanner.scan("AAA", bars, &ScanContext::default())
    }

    #[test]
    fn short_series_is_insufficient() {
        let scanner = Scanner::new(ScanConfig::live());
        let outcome = scan(&scanner, &trending(59, 50.0, 0.5, 500_000.0));
        assert!(matches!(outcome, Err(Rejection::InsufficientData(_))));
    }

    #[test]
    fn thin_volume_is_illiquid() {
        let scanner = always(ScanConfig::live(), Direction::Buy, -2.0, -1.0);
        let outcome = scan(&scanner, &trending(80, 50.0, 0.5, 1_000.0));
        let err = outcome.unwrap_err();
        assert!(matches!(err, Rejection::LiquidityRejected(_)));
        assert!(err.reason().contains("mean volume"));
    }

    #[test]
    fn penny_price_is_illiquid() {
        let scanner = always(ScanConfig::live(), Direction::Buy, -0.2, -0.1);
        let bars: Vec<Bar> = (0..80)
            .map(|i| Bar::new(day(i), 5.0, 5.5, 4.5, 5.0, 1_000_000.0))
            .collect();
        assert!(matches!(scan(&scanner, &bars), Err(Rejection::LiquidityRejected(_))));
    }

    #[test]
    fn flat_market_has_no_setup() {
        let scanner = Scanner::new(ScanConfig::live());
        let bars: Vec<Bar> = (0..80)
            .map(|i| Bar::new(day(i), 100.0, 101.0, 99.0, 100.0, 1_000_000.0))
            .collect();
        assert!(matches!(scan(&scanner, &bars), Err(Rejection::NoSetup(_))));
    }

    #[test]
    fn model_setup_produces_full_record() {
        let scanner = always(ScanConfig::live(), Direction::Buy, -2.0, -1.0);
        let record = scan(&scanner, &trending(80, 50.0, 0.5, 500_000.0)).unwrap();
        // close 89.5, zone (87.5, 88.5), stop 87.5 * 0.97
        assert_eq!(record.signal, Direction::Buy);
        assert_eq!(record.model_name, "Always");
        assert_eq!(record.entry_price, 89.5);
        assert!((record.stop_loss - 84.875).abs() < 1e-9);
        assert!((record.risk() - 4.625).abs() < 1e-9);
        assert_eq!(record.take_profit_levels.len(), 1);
        assert!((record.take_profit_levels[0] - 101.0625).abs() < 1e-9);
        assert!((record.break_even_price - 97.825).abs() < 1e-9);
        assert_eq!(record.score, 1.0);
        assert!(!record.confirmed);
        assert_eq!(record.confirmation_timeframe, "1D");
        assert_eq!(record.d1_poi, Some(88.0));
        assert!((record.distance_to_poi_pct - 1.5 / 88.0 * 100.0).abs() < 1e-9);
        // risk 1e7 / 4625 = 2162 units, capital 2e8 / 89_500 = 2234; lots of 100
        assert_eq!(record.quantity, 2_100.0);
        assert!(record.note.starts_with("Always | 1.7% from POI | D1 Only"));
    }

    #[test]
    fn zone_with_averages_inside_is_strong() {
        // closes 50..89.5: SMA_10 87.25, SMA_20 84.75, EMA_50 and SMA_50 77.25
        let scanner = always(ScanConfig::live(), Direction::Buy, -5.0, -1.0);
        let record = scan(&scanner, &trending(80, 50.0, 0.5, 500_000.0)).unwrap();
        assert_eq!(record.confluence, vec!["SMA_10".to_string(), "SMA_20".to_string()]);
        assert_eq!(record.poi_strength, Some(Strength::Strong));
        assert_eq!(record.poi_label.as_deref(), Some("FVG + S10,S20"));
    }

    #[test]
    fn zone_clear_of_averages_stays_normal() {
        let scanner = always(ScanConfig::live(), Direction::Buy, -2.0, -1.0);
        let record = scan(&scanner, &trending(80, 50.0, 0.5, 500_000.0)).unwrap();
        assert!(record.confluence.is_empty());
        assert_eq!(record.poi_strength, Some(Strength::Normal));
        assert_eq!(record.poi_label.as_deref(), Some("FVG"));
    }

    #[test]
    fn sell_setup_mirrors_levels() {
        let scanner = always(ScanConfig::live(), Direction::Sell, 1.0, 2.0);
        let record = scan(&scanner, &trending(80, 100.0, -0.5, 500_000.0)).unwrap();
        assert_eq!(record.signal, Direction::Sell);
        assert!(record.stop_loss > record.entry_price);
        assert!(record.take_profit_levels.iter().all(|tp| *tp < record.entry_price));
        assert!(record.break_even_price < record.entry_price);
    }

    #[test]
    fn buy_against_downtrend_is_filtered() {
        let scanner = always(ScanConfig::live(), Direction::Buy, -2.0, -1.0);
        let outcome = scan(&scanner, &trending(80, 100.0, -0.5, 500_000.0));
        assert!(matches!(outcome, Err(Rejection::TrendFilterRejected(_))));
    }

    #[test]
    fn stop_above_entry_is_invalid_geometry() {
        let scanner = always(ScanConfig::live(), Direction::Buy, 9.0, 18.0);
        let outcome = scan(&scanner, &trending(80, 50.0, 0.5, 500_000.0));
        assert_eq!(outcome, Err(Rejection::InvalidGeometry("Risk invalid".into())));
    }

    #[test]
    fn backtest_preset_requires_score() {
        let scanner = always(ScanConfig::backtest(), Direction::Buy, -2.0, -1.0);
        let outcome = scan(&scanner, &trending(80, 50.0, 0.5, 500_000.0));
        assert!(matches!(outcome, Err(Rejection::ScoreTooLow(_))));
    }

    #[test]
    fn atr_buffer_widens_stop() {
        let config = ScanConfig {
            min_score: None,
            ..ScanConfig::backtest()
        };
        let scanner = always(config, Direction::Buy, -2.0, -1.0);
        let record = scan(&scanner, &trending(80, 50.0, 0.5, 500_000.0)).unwrap();
        // every true range is 1.3, so ATR is 1.3 and the stop sits 1.04 under 87.5
        assert!((record.stop_loss - (87.5 - 0.8 * 1.3)).abs() < 1e-6);
    }

    #[test]
    fn candle_fallback_when_no_model_fires() {
        let scanner = Scanner::new(ScanConfig::live());
        let record = scan(&scanner, &engulfing_daily()).unwrap();
        assert_eq!(record.signal, Direction::Buy);
        assert_eq!(record.model_name, "Engulfing (Bull)");
        // engulfing 1.5 + volume spike 0.5
        assert_eq!(record.score, 2.0);
        assert!((record.stop_loss - 99.4 * 0.97).abs() < 1e-9);
        assert_eq!(record.d1_poi, Some((99.4 + 101.0) / 2.0));
    }

    #[test]
    fn lower_timeframe_confirmation_refines_and_adds_bonus() {
        let daily = engulfing_daily();
        let as_of = session_as_of(daily[79].timestamp);
        let mut m15: Vec<Bar> = (0..30)
            .map(|i| {
                let ts = as_of - chrono::Duration::minutes(15 * (29 - i));
                Bar::new(ts, 100.0, 101.0, 99.0, 100.0, 1000.0)
            })
            .collect();
        m15[28] = Bar::new(m15[28].timestamp, 100.5, 101.0, 99.5, 99.8, 1000.0);
        m15[29] = Bar::new(m15[29].timestamp, 99.6, 101.2, 99.4, 101.0, 3000.0);
        let mut store = BarStore::new();
        store.insert(Series::new("AAA", Timeframe::M15, m15).unwrap());

        let scanner = Scanner::new(ScanConfig::live());
        let ctx = ScanContext {
            lower: Some(&store),
            ..ScanContext::default()
        };
        let record = scanner.scan("AAA", &daily, &ctx).unwrap();
        assert!(record.confirmed);
        assert_eq!(record.confirmation_timeframe, "15m");
        assert_eq!(record.confirmation_pattern, "Engulfing (Bull) (Sniper)");
        assert_eq!(record.entry_price, 101.0);
        assert!((record.stop_loss - 99.4 * 0.97).abs() < 1e-9);
        // engulfing 1.5 + volume spike 0.5 + confirmation 1.2
        assert!((record.score - 3.2).abs() < 1e-9);
        assert!(record.note.ends_with("Confirm 15m"));
    }

    #[test]
    fn batch_sorts_and_counts() {
        let mut store = BarStore::new();
        store.insert(Series::new("UP", Timeframe::D1, trending(80, 50.0, 0.5, 500_000.0)).unwrap());
        store.insert(
            Series::new("DOWN", Timeframe::D1, trending(80, 100.0, -0.5, 500_000.0)).unwrap(),
        );
        let scanner = always(ScanConfig::live(), Direction::Buy, -2.0, -1.0);
        let symbols: Vec<String> = ["DOWN", "MISSING", "UP"].iter().map(|s| s.to_string()).collect();
        let report = scan_batch(&scanner, &store, &symbols, None);
        assert_eq!(report.total(), 3);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].symbol, "UP");
        assert_eq!(report.rejections.get("trend_filter_rejected"), Some(&1));
        assert_eq!(report.rejections.get("insufficient_data"), Some(&1));
    }

    #[test]
    fn session_as_of_only_moves_midnight() {
        let d = day(3);
        assert_eq!(session_as_of(d).to_string(), "2024-01-04 14:30:00");
        let intraday = d + chrono::Duration::hours(10);
        assert_eq!(session_as_of(intraday), intraday);
    }

    #[test]
    fn pair_is_cut_at_scan_bar() {
        let bars = trending(10, 50.0, 0.5, 1.0);
        assert_eq!(pair_until(&bars, day(4)).len(), 5);
        assert_eq!(pair_until(&bars, day(100)).len(), 10);
    }

    #[test]
    fn rejection_serializes_with_kind_and_reason() {
        let json = serde_json::to_string(&Rejection::NoSetup("no daily setup".into())).unwrap();
        assert_eq!(json, r#"{"kind":"no_setup","reason":"no daily setup"}"#);
    }
}
