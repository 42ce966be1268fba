//! Bar loading for the runner.
//!
//! Bars live on disk as `<dir>/<TIMEFRAME>/<SYMBOL>.csv` with the header
//! `timestamp,open,high,low,close,volume`. Loading follows a fallback policy:
//! 1. If a daily CSV exists → use it
//! 2. If not and `synthetic` is set → generate synthetic daily bars (tagged)
//! 3. Otherwise → fail with a clear error
//!
//! Hourly and 15-minute files are optional; when present they feed the
//! lower-timeframe confirmer through [`BarStore`].

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use sniperlab_core::confirm::LowerTimeframeSource;
use sniperlab_core::domain::{Bar, LtfSeries, Series, Timeframe};
use sniperlab_core::SeriesError;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no {timeframe} data for '{symbol}' at {} (use --synthetic for synthetic data)", .path.display())]
    Missing {
        symbol: String,
        timeframe: Timeframe,
        path: PathBuf,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: row {row}: unrecognised timestamp '{value}'", .path.display())]
    Timestamp {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub dir: PathBuf,
    /// Generate synthetic daily bars when a symbol has no CSV.
    pub synthetic: bool,
    pub synthetic_bars: usize,
    /// Last session of the synthetic series.
    pub synthetic_end: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// `YYYY-MM-DD` (midnight) or `YYYY-MM-DD HH:MM[:SS]`; a `T` separator is accepted.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for format in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse CSV bars from any reader. `path` only labels errors.
pub fn read_bars<R: Read>(reader: R, path: &Path) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for (row, record) in rdr.deserialize::<CsvRow>().enumerate() {
        let record = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let timestamp = parse_timestamp(&record.timestamp).ok_or_else(|| LoadError::Timestamp {
            path: path.to_path_buf(),
            row: row + 1,
            value: record.timestamp.clone(),
        })?;
        bars.push(Bar::new(
            timestamp,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        ));
    }
    Ok(bars)
}

pub fn series_path(dir: &Path, symbol: &str, timeframe: Timeframe) -> PathBuf {
    dir.join(timeframe.as_str()).join(format!("{symbol}.csv"))
}

/// Load one symbol and timeframe from the CSV tree.
pub fn load_series(dir: &Path, symbol: &str, timeframe: Timeframe) -> Result<Series, LoadError> {
    let path = series_path(dir, symbol, timeframe);
    if !path.exists() {
        return Err(LoadError::Missing {
            symbol: symbol.to_string(),
            timeframe,
            path,
        });
    }
    let file = std::fs::File::open(&path).map_err(|e| LoadError::Csv {
        path: path.clone(),
        source: csv::Error::from(e),
    })?;
    let bars = read_bars(file, &path)?;
    Ok(Series::new(symbol, timeframe, bars)?)
}

/// In-memory bars for every loaded symbol and timeframe.
#[derive(Debug, Clone, Default)]
pub struct BarStore {
    series: BTreeMap<(String, Timeframe), Series>,
    synthetic: BTreeSet<String>,
}

impl BarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load daily bars for `symbols` plus any intraday files next to them.
    pub fn load(symbols: &[String], opts: &LoadOptions) -> Result<Self, LoadError> {
        let mut store = Self::new();
        for symbol in symbols {
            match load_series(&opts.dir, symbol, Timeframe::D1) {
                Ok(series) => store.insert(series),
                Err(LoadError::Missing { .. }) if opts.synthetic => {
                    warn!(symbol = %symbol, "generating synthetic data; results are tagged as synthetic");
                    let bars = generate_synthetic_bars(symbol, opts.synthetic_bars, opts.synthetic_end);
                    store.insert(Series::new(symbol.as_str(), Timeframe::D1, bars)?);
                    store.synthetic.insert(symbol.clone());
                    continue;
                }
                Err(e) => return Err(e),
            }
            for timeframe in [Timeframe::H1, Timeframe::M15] {
                match load_series(&opts.dir, symbol, timeframe) {
                    Ok(series) => store.insert(series),
                    Err(LoadError::Missing { .. }) => {
                        debug!(symbol = %symbol, %timeframe, "no intraday file");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(store)
    }

    pub fn insert(&mut self, series: Series) {
        let key = (series.symbol().to_string(), series.timeframe());
        self.series.insert(key, series);
    }

    pub fn get(&self, symbol: &str, timeframe: Timeframe) -> Option<&Series> {
        self.series.get(&(symbol.to_string(), timeframe))
    }

    pub fn daily(&self, symbol: &str) -> Option<&Series> {
        self.get(symbol, Timeframe::D1)
    }

    /// Symbols with daily bars, sorted.
    pub fn symbols(&self) -> Vec<String> {
        self.series
            .keys()
            .filter(|(_, tf)| *tf == Timeframe::D1)
            .map(|(s, _)| s.clone())
            .collect()
    }

    pub fn has_synthetic(&self) -> bool {
        !self.synthetic.is_empty()
    }

    pub fn is_synthetic(&self, symbol: &str) -> bool {
        self.synthetic.contains(symbol)
    }

    /// Deterministic BLAKE3 hash over every stored bar.
    ///
    /// Keys are iterated in sorted order, so the hash does not depend on
    /// load order.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for ((symbol, timeframe), series) in &self.series {
            hasher.update(symbol.as_bytes());
            hasher.update(timeframe.as_str().as_bytes());
            for bar in series.bars() {
                hasher.update(&bar.timestamp.and_utc().timestamp().to_le_bytes());
                hasher.update(&bar.open.to_le_bytes());
                hasher.update(&bar.high.to_le_bytes());
                hasher.update(&bar.low.to_le_bytes());
                hasher.update(&bar.close.to_le_bytes());
                hasher.update(&bar.volume.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl LowerTimeframeSource for BarStore {
    fn lower_timeframe(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback_days: i64,
        as_of: NaiveDateTime,
    ) -> Option<LtfSeries> {
        let series = self.get(symbol, timeframe)?;
        let ltf = LtfSeries::new(series, as_of, lookback_days);
        (!ltf.is_empty()).then_some(ltf)
    }
}

/// Synthetic weekday bars ending on `end`, for development only.
///
/// A random walk from 50.0 seeded by the symbol name, so the same symbol
/// always produces the same bars.
pub fn generate_synthetic_bars(symbol: &str, count: usize, end: NaiveDate) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut dates = Vec::with_capacity(count);
    let mut current = end;
    while dates.len() < count {
        if !matches!(current.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun) {
            dates.push(current);
        }
        current -= chrono::Duration::days(1);
    }
    dates.reverse();

    let mut price = 50.0_f64;
    dates
        .into_iter()
        .filter_map(|date| {
            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = (price * (1.0 + daily_return)).max(1.0);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.015));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.015));
            let volume = rng.gen_range(300_000.0..3_000_000.0);
            price = close;
            Some(Bar::new(date.and_hms_opt(0, 0, 0)?, open, high, low, close, volume))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    fn write_csv(dir: &Path, timeframe: Timeframe, symbol: &str, body: &str) {
        let path = series_path(dir, symbol, timeframe);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    fn opts(dir: &Path, synthetic: bool) -> LoadOptions {
        LoadOptions {
            dir: dir.to_path_buf(),
            synthetic,
            synthetic_bars: 120,
            synthetic_end: end(),
        }
    }

    #[test]
    fn parses_date_and_datetime() {
        let d = parse_timestamp("2024-03-04").unwrap();
        assert_eq!(d.to_string(), "2024-03-04 00:00:00");
        let t = parse_timestamp("2024-03-04 09:15").unwrap();
        assert_eq!(t.to_string(), "2024-03-04 09:15:00");
        let t = parse_timestamp("2024-03-04T14:30:00").unwrap();
        assert_eq!(t.to_string(), "2024-03-04 14:30:00");
        assert!(parse_timestamp("04/03/2024").is_none());
    }

    #[test]
    fn loads_daily_and_intraday() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            Timeframe::D1,
            "FPT",
            "timestamp,open,high,low,close,volume\n\
             2024-03-01,100,102,99,101,1000\n\
             2024-03-04,101,103,100,102,1100\n",
        );
        write_csv(
            dir.path(),
            Timeframe::M15,
            "FPT",
            "timestamp,open,high,low,close,volume\n\
             2024-03-04 09:15,101,101.5,100.5,101.2,300\n\
             2024-03-04 09:30,101.2,102,101,101.8,400\n",
        );
        let store = BarStore::load(&["FPT".to_string()], &opts(dir.path(), false)).unwrap();
        assert_eq!(store.daily("FPT").unwrap().len(), 2);
        assert_eq!(store.get("FPT", Timeframe::M15).unwrap().len(), 2);
        assert!(store.get("FPT", Timeframe::H1).is_none());
        assert!(!store.has_synthetic());
        assert_eq!(store.symbols(), vec!["FPT"]);
    }

    #[test]
    fn missing_daily_fails_without_synthetic() {
        let dir = tempfile::tempdir().unwrap();
        let err = BarStore::load(&["HPG".to_string()], &opts(dir.path(), false)).unwrap_err();
        assert!(matches!(err, LoadError::Missing { .. }));
        assert!(err.to_string().contains("--synthetic"));
    }

    #[test]
    fn synthetic_fallback_is_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let store = BarStore::load(&["FAKE".to_string()], &opts(dir.path(), true)).unwrap();
        assert!(store.has_synthetic());
        assert!(store.is_synthetic("FAKE"));
        let series = store.daily("FAKE").unwrap();
        assert_eq!(series.len(), 120);
        assert_eq!(series.last().unwrap().date(), end());
    }

    #[test]
    fn unsorted_csv_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            Timeframe::D1,
            "VNM",
            "timestamp,open,high,low,close,volume\n\
             2024-03-04,100,102,99,101,1000\n\
             2024-03-01,101,103,100,102,1100\n",
        );
        let err = BarStore::load(&["VNM".to_string()], &opts(dir.path(), false)).unwrap_err();
        assert!(matches!(err, LoadError::Series(SeriesError::OutOfOrder { .. })));
    }

    #[test]
    fn bad_rows_are_errors() {
        let bad_ts = "timestamp,open,high,low,close,volume\nyesterday,1,2,0.5,1.5,10\n";
        let err = read_bars(bad_ts.as_bytes(), Path::new("x.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Timestamp { row: 1, .. }));

        let bad_num = "timestamp,open,high,low,close,volume\n2024-01-02,one,2,0.5,1.5,10\n";
        let err = read_bars(bad_num.as_bytes(), Path::new("x.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));
    }

    #[test]
    fn synthetic_data_is_deterministic_and_sane() {
        let a = generate_synthetic_bars("SPY", 60, end());
        let b = generate_synthetic_bars("SPY", 60, end());
        let c = generate_synthetic_bars("QQQ", 60, end());
        assert_eq!(a, b);
        assert_ne!(a[0].close, c[0].close);
        assert!(a.iter().all(Bar::is_sane));
        assert!(a
            .iter()
            .all(|bar| !matches!(bar.date().weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)));
    }

    #[test]
    fn ltf_source_cuts_at_as_of() {
        let mut store = BarStore::new();
        let bars: Vec<Bar> = (0..8)
            .map(|i| {
                let ts = parse_timestamp("2024-03-04 09:00").unwrap()
                    + chrono::Duration::minutes(15 * i);
                Bar::new(ts, 10.0, 11.0, 9.0, 10.0, 100.0)
            })
            .collect();
        store.insert(Series::new("FPT", Timeframe::M15, bars).unwrap());
        let as_of = parse_timestamp("2024-03-04 09:30").unwrap();
        let ltf = store.lower_timeframe("FPT", Timeframe::M15, 5, as_of).unwrap();
        assert_eq!(ltf.bars().len(), 3);
        assert!(store.lower_timeframe("FPT", Timeframe::H1, 20, as_of).is_none());
        let before = parse_timestamp("2024-03-01 09:00").unwrap();
        assert!(store.lower_timeframe("FPT", Timeframe::M15, 5, before).is_none());
    }

    #[test]
    fn dataset_hash_is_order_independent() {
        let mut a = BarStore::new();
        let mut b = BarStore::new();
        let x = Series::new("X", Timeframe::D1, generate_synthetic_bars("X", 10, end())).unwrap();
        let y = Series::new("Y", Timeframe::D1, generate_synthetic_bars("Y", 10, end())).unwrap();
        a.insert(x.clone());
        a.insert(y.clone());
        b.insert(y);
        b.insert(x);
        assert_eq!(a.dataset_hash(), b.dataset_hash());
        assert_ne!(a.dataset_hash(), BarStore::new().dataset_hash());
    }
}
