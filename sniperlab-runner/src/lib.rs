//! SniperLab Runner — scanning, backtest orchestration, metrics and export.
//!
//! This crate builds on `sniperlab-core` to provide:
//! - Config files with live and backtest presets, fingerprinted into run ids
//! - CSV bar loading with a synthetic fallback
//! - The per-symbol scanner producing signal records or tagged rejections
//! - Parallel walk-forward replay and the shared-portfolio backtest
//! - Summary metrics, per-model breakdowns and JSON/CSV/Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod scanner;

pub use config::{BacktestConfig, ConfigError, ScanConfig, SniperConfig, StopBuffer};
pub use data_loader::{BarStore, LoadError, LoadOptions};
pub use metrics::{BacktestSummary, ModelStats};
pub use runner::{run_backtest, run_backtest_with, BacktestReport, RunError};
pub use scanner::{
    scan_batch, scan_symbol, Rejection, ScanContext, ScanOutcome, ScanReport, Scanner,
    SignalRecord,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn scanner_is_send_sync() {
        assert_send::<Scanner>();
        assert_sync::<Scanner>();
    }

    #[test]
    fn bar_store_is_send_sync() {
        assert_send::<BarStore>();
        assert_sync::<BarStore>();
    }

    #[test]
    fn records_are_send_sync() {
        assert_send::<SignalRecord>();
        assert_sync::<SignalRecord>();
        assert_send::<Rejection>();
        assert_sync::<Rejection>();
        assert_send::<ScanReport>();
        assert_sync::<ScanReport>();
    }

    #[test]
    fn backtest_report_is_send_sync() {
        assert_send::<BacktestReport>();
        assert_sync::<BacktestReport>();
        assert_send::<BacktestSummary>();
        assert_sync::<BacktestSummary>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<SniperConfig>();
        assert_sync::<SniperConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }
}
