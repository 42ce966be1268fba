//! Serializable scan and backtest configuration.
//!
//! Every section has serde defaults, so an empty TOML file is a valid config
//! and a partial one only overrides what it names.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sniperlab_core::simulate::{ExitRules, MergeRules};
use sniperlab_core::sizing::SizingRules;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to fingerprint config: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// How far beyond the raw zone bound the protective stop is placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StopBuffer {
    /// Fraction of the raw stop price (0.03 = 3%).
    Percent { pct: f64 },
    /// Multiple of the ATR at the signal bar.
    Atr { period: usize, multiple: f64 },
}

/// Minimum tradability of a symbol, checked on the latest bars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityRules {
    pub min_price: f64,
    /// Mean volume over `window` bars.
    pub min_volume: f64,
    /// Close times mean volume.
    pub min_turnover: f64,
    pub window: usize,
}

impl Default for LiquidityRules {
    fn default() -> Self {
        Self {
            min_price: 10.0,
            min_volume: 100_000.0,
            min_turnover: 10_000_000.0,
            window: 5,
        }
    }
}

/// Parameters of a single-symbol scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub liquidity: LiquidityRules,
    pub ema_period: usize,
    /// BUY is rejected at or below `EMA * (1 - tolerance)`, SELL mirrors it.
    pub trend_tolerance: f64,
    pub stop_buffer: StopBuffer,
    /// Setups scoring below this are rejected. `None` keeps everything.
    pub min_score: Option<f64>,
    /// Account value the suggested quantity is sized from.
    pub nav: f64,
    pub sizing: SizingRules,
}

impl ScanConfig {
    /// Daily live scan: 3% stop buffer and trend tolerance, 10M turnover.
    pub fn live() -> Self {
        Self {
            liquidity: LiquidityRules::default(),
            ema_period: 50,
            trend_tolerance: 0.03,
            stop_buffer: StopBuffer::Percent { pct: 0.03 },
            min_score: None,
            nav: 1_000_000_000.0,
            sizing: SizingRules::live(),
        }
    }

    /// Replay scan: 0.8 ATR stop buffer, strict trend filter, 3M turnover,
    /// minimum score 3.5.
    pub fn backtest() -> Self {
        Self {
            liquidity: LiquidityRules {
                min_turnover: 3_000_000.0,
                ..LiquidityRules::default()
            },
            ema_period: 50,
            trend_tolerance: 0.0,
            stop_buffer: StopBuffer::Atr {
                period: 14,
                multiple: 0.8,
            },
            min_score: Some(3.5),
            nav: 1_000_000_000.0,
            sizing: SizingRules::backtest(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ema_period == 0 {
            return Err(ConfigError::Invalid("ema_period must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.trend_tolerance) {
            return Err(ConfigError::Invalid(format!(
                "trend_tolerance {} outside [0, 1)",
                self.trend_tolerance
            )));
        }
        match self.stop_buffer {
            StopBuffer::Percent { pct } if !(0.0..1.0).contains(&pct) => {
                return Err(ConfigError::Invalid(format!(
                    "stop buffer pct {pct} outside [0, 1)"
                )));
            }
            StopBuffer::Atr { period, multiple } if period == 0 || multiple < 0.0 => {
                return Err(ConfigError::Invalid(
                    "ATR stop buffer needs a positive period and a non-negative multiple".into(),
                ));
            }
            _ => {}
        }
        if self.liquidity.window == 0 {
            return Err(ConfigError::Invalid("liquidity window must be positive".into()));
        }
        validate_sizing(&self.sizing)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::live()
    }
}

/// Which bars of each symbol are replayed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayWindow {
    /// Bars needed before the first replayed signal.
    pub warmup_bars: usize,
    /// Only the most recent `window_bars` bars generate signals.
    pub window_bars: usize,
}

impl Default for ReplayWindow {
    fn default() -> Self {
        Self {
            warmup_bars: 60,
            window_bars: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub scan: ScanConfig,
    pub replay: ReplayWindow,
    pub exit: ExitRules,
    pub portfolio: MergeRules,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::backtest(),
            replay: ReplayWindow::default(),
            exit: ExitRules::default(),
            portfolio: MergeRules::default(),
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scan.validate()?;
        if self.replay.window_bars == 0 {
            return Err(ConfigError::Invalid("window_bars must be positive".into()));
        }
        if self.exit.max_hold_bars == 0 {
            return Err(ConfigError::Invalid("max_hold_bars must be positive".into()));
        }
        if self.portfolio.max_concurrent == 0 {
            return Err(ConfigError::Invalid("max_concurrent must be at least 1".into()));
        }
        if !(self.portfolio.initial_balance > 0.0) {
            return Err(ConfigError::Invalid("initial_balance must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.portfolio.fee_rate) {
            return Err(ConfigError::Invalid(format!(
                "fee_rate {} outside [0, 1)",
                self.portfolio.fee_rate
            )));
        }
        validate_sizing(&self.portfolio.sizing)
    }
}

fn validate_sizing(sizing: &SizingRules) -> Result<(), ConfigError> {
    if !(sizing.risk_pct > 0.0 && sizing.risk_pct <= 1.0) {
        return Err(ConfigError::Invalid(format!(
            "risk_pct {} outside (0, 1]",
            sizing.risk_pct
        )));
    }
    if !(sizing.max_position_pct > 0.0 && sizing.max_position_pct <= 1.0) {
        return Err(ConfigError::Invalid(format!(
            "max_position_pct {} outside (0, 1]",
            sizing.max_position_pct
        )));
    }
    if !(sizing.lot_size > 0.0 && sizing.price_multiplier > 0.0) {
        return Err(ConfigError::Invalid(
            "lot_size and price_multiplier must be positive".into(),
        ));
    }
    Ok(())
}

/// Where bars come from and which symbols to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root of the `<dir>/<TIMEFRAME>/<SYMBOL>.csv` tree.
    pub dir: PathBuf,
    pub symbols: Vec<String>,
    /// Correlated index for SMT divergence.
    pub pair: Option<String>,
    /// Daily bars generated per symbol with `--synthetic`.
    pub synthetic_bars: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            symbols: Vec::new(),
            pair: None,
            synthetic_bars: 300,
        }
    }
}

/// Top-level config file: `[data]`, `[scan]` and `[backtest]` sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SniperConfig {
    pub data: DataConfig,
    pub scan: ScanConfig,
    pub backtest: BacktestConfig,
}

impl SniperConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.scan.validate()?;
        config.backtest.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Deterministic hash over the JSON form of the config.
    ///
    /// Two runs with identical configs share a run id.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        fingerprint(self)
    }
}

/// BLAKE3 hex digest of any serializable config section.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<RunId, ConfigError> {
    let json = serde_json::to_string(value)?;
    Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
}
