//! Reporting and export — JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats:
//! - **JSON**: full round-trip serialization of a backtest with schema versioning
//! - **CSV**: scan signals, trade journal and balance ledger for spreadsheets
//! - **Markdown**: a human-readable backtest report with a per-model table
//!
//! Persisted backtests include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use sniperlab_core::domain::{LedgerEntry, Trade};

use crate::runner::{BacktestReport, SCHEMA_VERSION};
use crate::scanner::{ScanReport, SignalRecord};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestReport` to pretty JSON.
pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a `BacktestReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

/// Scan records as a pretty JSON array.
pub fn export_signals_json(records: &[SignalRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).context("failed to serialize signals to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export scan records, one row per signal.
///
/// Take-profit levels are joined with `;` in one column.
pub fn export_signals_csv(records: &[SignalRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "as_of",
        "signal",
        "score",
        "entry_price",
        "stop_loss",
        "take_profit_levels",
        "break_even_price",
        "model_name",
        "confirmed",
        "confirmation_timeframe",
        "confirmation_pattern",
        "close",
        "d1_poi",
        "poi_label",
        "poi_strength",
        "confluence",
        "distance_to_poi_pct",
        "quantity",
        "note",
    ])?;

    for r in records {
        let targets = r
            .take_profit_levels
            .iter()
            .map(|tp| format!("{tp:.4}"))
            .collect::<Vec<_>>()
            .join(";");
        wtr.write_record([
            r.symbol.as_str(),
            &r.as_of.to_string(),
            r.signal.as_str(),
            &format!("{:.1}", r.score),
            &format!("{:.4}", r.entry_price),
            &format!("{:.4}", r.stop_loss),
            &targets,
            &format!("{:.4}", r.break_even_price),
            &r.model_name,
            &r.confirmed.to_string(),
            &r.confirmation_timeframe,
            &r.confirmation_pattern,
            &format!("{:.4}", r.close),
            &r.d1_poi.map(|p| format!("{p:.4}")).unwrap_or_default(),
            r.poi_label.as_deref().unwrap_or_default(),
            r.poi_strength.map(|s| s.as_str()).unwrap_or_default(),
            &r.confluence.join(";"),
            &format!("{:.2}", r.distance_to_poi_pct),
            &format!("{:.0}", r.quantity),
            &r.note,
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the trade journal with research columns.
///
/// Open trades leave the exit columns empty.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "side",
        "entry_time",
        "entry_price",
        "stop_loss",
        "take_profit",
        "state",
        "exit_time",
        "exit_price",
        "quantity",
        "fee",
        "pnl",
        "r_multiple",
        "score",
        "model",
        "confirmed",
        "confirmation_timeframe",
    ])?;

    for t in trades {
        wtr.write_record([
            t.symbol.as_str(),
            t.side.as_str(),
            &t.entry_time.to_string(),
            &format!("{:.4}", t.entry_price),
            &format!("{:.4}", t.stop_loss),
            &format!("{:.4}", t.take_profit),
            t.state.as_str(),
            &t.exit_time.map(|x| x.to_string()).unwrap_or_default(),
            &t.exit_price.map(|x| format!("{x:.4}")).unwrap_or_default(),
            &format!("{:.0}", t.quantity),
            &format!("{:.2}", t.fee),
            &format!("{:.2}", t.pnl),
            &format!("{:.2}", t.r_multiple()),
            &format!("{:.1}", t.score),
            &t.model,
            &t.confirmed.to_string(),
            &t.confirmation_timeframe,
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the balance ledger, one row per realized PnL.
pub fn export_ledger_csv(ledger: &[LedgerEntry]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["time", "symbol", "pnl", "balance"])?;
    for e in ledger {
        wtr.write_record([
            &e.time.to_string(),
            &e.symbol,
            &format!("{:.2}", e.pnl),
            &format!("{:.2}", e.balance),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

fn timestamped_dir(output_dir: &Path, prefix: &str) -> Result<PathBuf> {
    let dirname = format!("{prefix}_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;
    Ok(run_dir)
}

/// Save the full artifact set for a backtest.
///
/// Creates a directory named `backtest_{timestamp}/` under `output_dir`
/// containing:
/// - `manifest.json` — the full `BacktestReport`
/// - `trades.csv` — trade journal
/// - `ledger.csv` — balance after each realized PnL
/// - `report.md` — Markdown summary
///
/// Returns the path to the created directory.
pub fn save_backtest_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = timestamped_dir(output_dir, "backtest")?;

    std::fs::write(run_dir.join("manifest.json"), export_json(report)?)?;
    std::fs::write(
        run_dir.join("trades.csv"),
        export_trades_csv(&report.result.trades)?,
    )?;
    std::fs::write(
        run_dir.join("ledger.csv"),
        export_ledger_csv(&report.result.ledger)?,
    )?;
    std::fs::write(run_dir.join("report.md"), generate_report(report))?;

    Ok(run_dir)
}

/// Save scan output as `signals.json` and `signals.csv` under `scan_{timestamp}/`.
pub fn save_scan_artifacts(report: &ScanReport, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = timestamped_dir(output_dir, "scan")?;
    std::fs::write(
        run_dir.join("signals.json"),
        export_signals_json(&report.records)?,
    )?;
    std::fs::write(
        run_dir.join("signals.csv"),
        export_signals_csv(&report.records)?,
    )?;
    Ok(run_dir)
}

/// Load a `BacktestReport` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestReport> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for a backtest.
pub fn generate_report(report: &BacktestReport) -> String {
    let mut md = String::with_capacity(2048);
    let s = &report.summary;
    let r = &report.result;

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbols | {} |\n", report.symbols.join(", ")));
    md.push_str(&format!("| Run ID | {} |\n", report.run_id));
    md.push_str(&format!("| Dataset Hash | {} |\n", report.dataset_hash));
    md.push_str(&format!("| Initial Balance | {:.0} |\n", r.initial_balance));
    md.push_str(&format!(
        "| Signals | {} ({} candidates) |\n",
        report.signal_count, report.candidate_count
    ));
    if report.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Final Balance | {:.0} |\n", r.final_balance));
    md.push_str(&format!("| Net Profit | {:.0} |\n", s.net_profit));
    md.push_str(&format!("| ROI | {:.2}% |\n", s.roi * 100.0));
    md.push_str(&format!(
        "| Max Drawdown | {:.2}% |\n",
        s.max_drawdown * 100.0
    ));
    md.push_str(&format!(
        "| Trades | {} ({} open) |\n",
        s.trade_count, s.open
    ));
    md.push_str(&format!(
        "| TP / BE / SL / Time | {} / {} / {} / {} |\n",
        s.tp, s.be, s.sl, s.time_exit
    ));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", s.win_rate * 100.0));
    md.push_str(&format!(
        "| Not-Loss Rate | {:.1}% |\n",
        s.not_loss_rate * 100.0
    ));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", s.profit_factor));
    md.push_str(&format!("| Avg R | {:.2} |\n", s.avg_r_multiple));
    md.push_str(&format!("| Avg Hold (days) | {:.1} |\n", s.avg_hold_days));
    md.push_str(&format!(
        "| Skipped (capacity / size) | {} / {} |\n",
        s.skipped_capacity, s.skipped_size
    ));
    md.push('\n');

    if !s.models.is_empty() {
        md.push_str("## Entry Models\n\n");
        md.push_str("| Model | Trades | TP | BE | SL | Win Rate | Net PnL | Avg Score | Confirmed |\n");
        md.push_str("| --- | --- | --- | --- | --- | --- | --- | --- | --- |\n");
        for m in &s.models {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {:.1}% | {:.0} | {:.2} | {:.0}% |\n",
                m.model,
                m.trades,
                m.tp,
                m.be,
                m.sl,
                m.win_rate * 100.0,
                m.net_pnl,
                m.avg_score,
                m.confirmation_rate * 100.0
            ));
        }
        md.push('\n');
    }

    if !report.rejections.is_empty() {
        md.push_str("## Scan Rejections\n\n");
        for (kind, count) in &report.rejections {
            md.push_str(&format!("- {kind}: {count}\n"));
        }
        md.push('\n');
    }

    md
}
