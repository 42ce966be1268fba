//! SniperLab CLI — scan, backtest and data inspection commands.
//!
//! Commands:
//! - `scan` — run the live scanner over a universe and print ranked signals as JSON
//! - `backtest` — replay the universe bar by bar against one portfolio
//! - `data status` — list the CSV tree: symbols, timeframes, bar counts, ranges
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (default `info`).

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use sniperlab_core::domain::Timeframe;
use sniperlab_runner::data_loader::{load_series, LoadError};
use sniperlab_runner::export::{export_signals_json, save_backtest_artifacts, save_scan_artifacts};
use sniperlab_runner::{
    run_backtest, scan_batch, BacktestReport, BarStore, LoadOptions, ScanReport, Scanner,
    SniperConfig,
};

#[derive(Parser)]
#[command(
    name = "sniperlab",
    about = "SniperLab CLI — smart-money pattern scanner and backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct DataArgs {
    /// Symbols to process. Defaults to `[data].symbols`, then every daily file.
    symbols: Vec<String>,

    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root of the `<dir>/<TIMEFRAME>/<SYMBOL>.csv` tree. Overrides `[data].dir`.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Correlated index for SMT divergence. Overrides `[data].pair`.
    #[arg(long)]
    pair: Option<String>,

    /// Generate synthetic daily bars for symbols with no file.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the latest bar of every symbol and print ranked signals.
    Scan {
        #[command(flatten)]
        data: DataArgs,

        /// Print a table instead of JSON records.
        #[arg(long, default_value_t = false)]
        table: bool,

        /// Also write signals.json and signals.csv under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Replay the universe bar by bar and simulate one shared portfolio.
    Backtest {
        #[command(flatten)]
        data: DataArgs,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Data directory commands.
    Data {
        #[command(subcommand)]
        action: DataAction,
    },
}

#[derive(Subcommand)]
enum DataAction {
    /// Report symbols, timeframes, bar counts and date ranges.
    Status {
        /// Data directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            data,
            table,
            output_dir,
        } => run_scan_cmd(data, table, output_dir),
        Commands::Backtest { data, output_dir } => run_backtest_cmd(data, output_dir),
        Commands::Data { action } => match action {
            DataAction::Status { data_dir } => run_data_status(&data_dir),
        },
    }
}

/// Config, universe and bars resolved from the shared arguments.
struct Workspace {
    config: SniperConfig,
    symbols: Vec<String>,
    pair: Option<String>,
    store: BarStore,
}

fn prepare(args: DataArgs) -> Result<Workspace> {
    let mut config = match &args.config {
        Some(path) => SniperConfig::from_file(path)?,
        None => SniperConfig::default(),
    };
    if let Some(dir) = args.data_dir {
        config.data.dir = dir;
    }
    if args.pair.is_some() {
        config.data.pair = args.pair;
    }

    let mut symbols = if args.symbols.is_empty() {
        config.data.symbols.clone()
    } else {
        args.symbols
    };
    if symbols.is_empty() {
        symbols = discover_symbols(&config.data.dir);
    }
    if symbols.is_empty() {
        bail!(
            "no symbols given and no daily files under {}",
            config.data.dir.join(Timeframe::D1.as_str()).display()
        );
    }

    let opts = LoadOptions {
        dir: config.data.dir.clone(),
        synthetic: args.synthetic,
        synthetic_bars: config.data.synthetic_bars,
        synthetic_end: chrono::Local::now().date_naive(),
    };
    let mut to_load = symbols.clone();
    if let Some(pair) = &config.data.pair {
        if !to_load.contains(pair) {
            to_load.push(pair.clone());
        }
    }
    let store = BarStore::load(&to_load, &opts)?;

    Ok(Workspace {
        pair: config.data.pair.clone(),
        config,
        symbols,
        store,
    })
}

fn run_scan_cmd(args: DataArgs, table: bool, output_dir: Option<PathBuf>) -> Result<()> {
    let ws = prepare(args)?;
    let scanner = Scanner::new(ws.config.scan.clone());
    let report = scan_batch(&scanner, &ws.store, &ws.symbols, ws.pair.as_deref());

    if table {
        print_scan(&report);
    } else {
        // stdout stays pure JSON; stats go to stderr
        println!("{}", export_signals_json(&report.records)?);
        for (kind, count) in &report.rejections {
            eprintln!("rejected {kind}: {count}");
        }
    }
    if ws.store.has_synthetic() {
        eprintln!("WARNING: Signals based on SYNTHETIC data");
    }

    if let Some(dir) = output_dir {
        let run_dir = save_scan_artifacts(&report, &dir)?;
        eprintln!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_backtest_cmd(args: DataArgs, output_dir: PathBuf) -> Result<()> {
    let ws = prepare(args)?;
    let report = run_backtest(
        &ws.store,
        &ws.symbols,
        &ws.config.backtest,
        ws.pair.as_deref(),
    )?;

    print_summary(&report);

    // manifest.json, trades.csv, ledger.csv, report.md
    let run_dir = save_backtest_artifacts(&report, &output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

/// Every `<dir>/1D/<SYMBOL>.csv`, sorted.
fn discover_symbols(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir.join(Timeframe::D1.as_str())) else {
        return Vec::new();
    };
    let mut symbols: Vec<String> = entries
        .flatten()
        .filter_map(|e| {
            let path = e.path();
            if path.extension()? != "csv" {
                return None;
            }
            Some(path.file_stem()?.to_string_lossy().to_string())
        })
        .collect();
    symbols.sort();
    symbols
}

fn run_data_status(data_dir: &Path) -> Result<()> {
    if !data_dir.exists() {
        println!("Data directory does not exist: {}", data_dir.display());
        return Ok(());
    }

    let symbols = discover_symbols(data_dir);
    if symbols.is_empty() {
        println!("No daily files in: {}", data_dir.display());
        return Ok(());
    }

    println!("Data: {}", data_dir.display());
    println!("Symbols: {}", symbols.len());
    println!();
    println!(
        "{:<8} {:<5} {:>7} {:<25} {:>10}",
        "Symbol", "TF", "Bars", "Range", "Size"
    );
    println!("{}", "-".repeat(60));
    for symbol in &symbols {
        for timeframe in [Timeframe::D1, Timeframe::H1, Timeframe::M15] {
            let path = sniperlab_runner::data_loader::series_path(data_dir, symbol, timeframe);
            match load_series(data_dir, symbol, timeframe) {
                Ok(series) => {
                    let range = match (series.bars().first(), series.last()) {
                        (Some(first), Some(last)) => {
                            format!("{} to {}", first.date(), last.date())
                        }
                        _ => "(empty)".into(),
                    };
                    let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                    println!(
                        "{:<8} {:<5} {:>7} {:<25} {:>10}",
                        symbol,
                        timeframe,
                        series.len(),
                        range,
                        format_size(size)
                    );
                }
                Err(LoadError::Missing { .. }) => {}
                Err(e) => println!("{:<8} {:<5} ERROR: {e}", symbol, timeframe),
            }
        }
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn print_scan(report: &ScanReport) {
    println!();
    println!("=== Scan Result ===");
    println!(
        "Symbols:        {} ({} signals)",
        report.total(),
        report.records.len()
    );
    println!();
    if !report.records.is_empty() {
        println!(
            "{:<8} {:<5} {:>5} {:>10} {:>10} {:>10}  {:<4} Note",
            "Symbol", "Side", "Score", "Entry", "Stop", "TP1", "TF"
        );
        println!("{}", "-".repeat(96));
        for r in &report.records {
            println!(
                "{:<8} {:<5} {:>5.1} {:>10.2} {:>10.2} {:>10.2}  {:<4} {}",
                r.symbol,
                r.signal,
                r.score,
                r.entry_price,
                r.stop_loss,
                r.nearest_target().unwrap_or(f64::NAN),
                r.confirmation_timeframe,
                r.note
            );
        }
        println!();
    }
    if !report.rejections.is_empty() {
        println!("--- Rejections ---");
        for (kind, count) in &report.rejections {
            println!("{kind:<22} {count}");
        }
        println!();
    }
}

fn print_summary(report: &BacktestReport) {
    let s = &report.summary;
    let r = &report.result;
    println!();
    println!("=== Backtest Result ===");
    println!("Symbols:        {}", report.symbols.join(", "));
    println!("Run ID:         {}", &report.run_id[..12.min(report.run_id.len())]);
    println!(
        "Signals:        {} ({} candidates)",
        report.signal_count, report.candidate_count
    );
    println!("Trades:         {} ({} open)", s.trade_count, s.open);
    println!(
        "Skipped:        {} capacity, {} size",
        s.skipped_capacity, s.skipped_size
    );
    println!();
    println!("--- Performance ---");
    println!("Initial:        {:.0}", r.initial_balance);
    println!("Final:          {:.0}", r.final_balance);
    println!("Net Profit:     {:.0}", s.net_profit);
    println!("ROI:            {:.2}%", s.roi * 100.0);
    println!("Max Drawdown:   {:.2}%", s.max_drawdown * 100.0);
    println!(
        "TP/BE/SL/Time:  {}/{}/{}/{}",
        s.tp, s.be, s.sl, s.time_exit
    );
    println!("Win Rate:       {:.1}%", s.win_rate * 100.0);
    println!("Not-Loss Rate:  {:.1}%", s.not_loss_rate * 100.0);
    println!("Profit Factor:  {:.2}", s.profit_factor);
    println!("Avg R:          {:.2}", s.avg_r_multiple);
    println!("Avg Hold:       {:.1} days", s.avg_hold_days);
    if !s.models.is_empty() {
        println!();
        println!("--- Entry Models ---");
        for m in &s.models {
            println!(
                "{:<24} {:>4} trades  win {:>5.1}%  pnl {:>14.0}",
                m.model,
                m.trades,
                m.win_rate * 100.0,
                m.net_pnl
            );
        }
    }
    if report.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}
