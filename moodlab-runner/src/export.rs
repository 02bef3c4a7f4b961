//! Export: CSV and JSON artifacts for single runs and sweeps.
//!
//! CSV writes an infinite profit factor as `inf`. JSON writes every non-finite
//! float as `null`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use moodlab_core::signals::TrendSignal;
use moodlab_core::Trade;

use crate::data_loader::format_timestamp;
use crate::runner::BacktestResult;
use crate::sweep::{SweepResults, SweepRow};

/// Shortest text that reads back to the same `f64`; infinity prints as `inf`.
fn float_cell(v: f64) -> String {
    v.to_string()
}

fn opt_cell(v: Option<f64>) -> String {
    v.map(float_cell).unwrap_or_default()
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Trade log ──────────────────────────────────────────────────────

/// Trade log as CSV, one row per trade in emission order.
///
/// Columns: action, timestamp, price, stop_loss (empty for closing trades).
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["action", "timestamp", "price", "stop_loss"])?;
    for t in trades {
        wtr.write_record([
            t.action.as_str().to_string(),
            format_timestamp(&t.timestamp),
            float_cell(t.price),
            opt_cell(t.stop_loss),
        ])?;
    }
    finish(wtr)
}

#[derive(Serialize)]
struct TradeJson<'a> {
    action: &'a str,
    timestamp: String,
    price: f64,
    stop_loss: Option<f64>,
}

pub fn export_trades_json(trades: &[Trade]) -> Result<String> {
    let rows: Vec<_> = trades
        .iter()
        .map(|t| TradeJson {
            action: t.action.as_str(),
            timestamp: format_timestamp(&t.timestamp),
            price: t.price,
            stop_loss: t.stop_loss,
        })
        .collect();
    serde_json::to_string_pretty(&rows).context("failed to serialize trade log")
}

// ─── Generated signals ──────────────────────────────────────────────

/// Generated trend signals in the same layout the signal loader reads,
/// plus the label and both trend columns.
pub fn export_signals_csv(signals: &[TrendSignal]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "sentiment_label",
        "bullish_trend",
        "bearish_trend",
        "signal",
        "confidence",
    ])?;
    for s in signals {
        wtr.write_record([
            format_timestamp(&s.timestamp),
            s.label.as_str().to_string(),
            float_cell(s.bullish_trend),
            float_cell(s.bearish_trend),
            s.signal.as_str().to_string(),
            float_cell(s.confidence),
        ])?;
    }
    finish(wtr)
}

// ─── Sweep table ────────────────────────────────────────────────────

const SWEEP_COLUMNS: [&str; 18] = [
    "index",
    "run_id",
    "stop_loss_pct",
    "take_profit_pct",
    "atr_multiplier",
    "ma_window",
    "rsi_overbought",
    "rsi_floor",
    "min_confidence",
    "final_balance",
    "roi_pct",
    "win_rate",
    "max_drawdown_pct",
    "profit_factor",
    "sharpe_ratio",
    "trade_count",
    "error",
    "dataset_hash",
];

/// Flat view of a sweep row: axis values and scalar metrics, no trade log.
#[derive(Debug, Serialize)]
pub struct SweepRecord<'a> {
    pub index: usize,
    pub run_id: &'a str,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub atr_multiplier: Option<f64>,
    pub ma_window: usize,
    pub rsi_overbought: f64,
    pub rsi_floor: f64,
    pub min_confidence: f64,
    pub final_balance: Option<f64>,
    pub roi_pct: Option<f64>,
    pub win_rate: Option<f64>,
    pub max_drawdown_pct: Option<f64>,
    pub profit_factor: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub trade_count: Option<usize>,
    pub error: Option<&'a str>,
    pub dataset_hash: &'a str,
}

impl<'a> SweepRecord<'a> {
    pub fn new(row: &'a SweepRow, dataset_hash: &'a str) -> Self {
        let p = &row.params;
        let m = row.result.as_ref();
        Self {
            index: row.index,
            run_id: &row.run_id,
            stop_loss_pct: p.stop_loss_pct,
            take_profit_pct: p.take_profit_pct,
            atr_multiplier: p.atr_multiplier,
            ma_window: p.ma_window,
            rsi_overbought: p.rsi_overbought,
            rsi_floor: p.rsi_floor,
            min_confidence: p.min_confidence,
            final_balance: m.map(|m| m.final_balance),
            roi_pct: m.map(|m| m.roi_pct),
            win_rate: m.map(|m| m.win_rate),
            max_drawdown_pct: m.map(|m| m.max_drawdown_pct),
            profit_factor: m.map(|m| m.profit_factor),
            sharpe_ratio: m.map(|m| m.sharpe_ratio),
            trade_count: m.map(|m| m.trade_count),
            error: row.error.as_deref(),
            dataset_hash,
        }
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.index.to_string(),
            self.run_id.to_string(),
            float_cell(self.stop_loss_pct),
            float_cell(self.take_profit_pct),
            opt_cell(self.atr_multiplier),
            self.ma_window.to_string(),
            float_cell(self.rsi_overbought),
            float_cell(self.rsi_floor),
            float_cell(self.min_confidence),
            opt_cell(self.final_balance),
            opt_cell(self.roi_pct),
            opt_cell(self.win_rate),
            opt_cell(self.max_drawdown_pct),
            opt_cell(self.profit_factor),
            opt_cell(self.sharpe_ratio),
            self.trade_count.map(|n| n.to_string()).unwrap_or_default(),
            self.error.unwrap_or_default().to_string(),
            self.dataset_hash.to_string(),
        ]
    }
}

fn records(results: &SweepResults) -> Vec<SweepRecord<'_>> {
    results
        .all()
        .iter()
        .map(|row| SweepRecord::new(row, &results.dataset_hash))
        .collect()
}

/// Sweep table as CSV, one row per combination in combination order.
pub fn export_sweep_csv(results: &SweepResults) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(SWEEP_COLUMNS)?;
    for record in records(results) {
        wtr.write_record(record.cells())?;
    }
    finish(wtr)
}

pub fn export_sweep_json(results: &SweepResults) -> Result<String> {
    serde_json::to_string_pretty(&records(results)).context("failed to serialize sweep table")
}

// ─── Run summary ────────────────────────────────────────────────────

/// Full `BacktestResult` as pretty JSON.
pub fn export_summary_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

// ─── Artifact bundles ───────────────────────────────────────────────

/// Save the artifact set for a single backtest run.
///
/// Creates `{output_dir}/{run_id prefix}/` containing:
/// - `summary.json`: the full `BacktestResult` (metrics, params, warnings, fingerprint)
/// - `trades.csv`: the trade log
///
/// Returns the path to the run directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = result.run_id.get(..12).unwrap_or(result.run_id.as_str());
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("summary.json"), export_summary_json(result)?)
        .context("failed to write summary.json")?;
    std::fs::write(
        run_dir.join("trades.csv"),
        export_trades_csv(&result.metrics.trades)?,
    )
    .context("failed to write trades.csv")?;

    Ok(run_dir)
}

/// Write `sweep.csv` and `sweep.json` into `output_dir`.
pub fn save_sweep(results: &SweepResults, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;
    let csv_path = output_dir.join("sweep.csv");
    std::fs::write(&csv_path, export_sweep_csv(results)?)
        .with_context(|| format!("failed to write {}", csv_path.display()))?;
    std::fs::write(output_dir.join("sweep.json"), export_sweep_json(results)?)
        .context("failed to write sweep.json")?;
    Ok(csv_path)
}
