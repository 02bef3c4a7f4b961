//! Backtest runner: wires loading, alignment, the engine and metrics together.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads the CSV inputs named by a config, then runs.
//! - `run_prepared()`: takes already-aligned data plus a parameter set. Used by the sweep,
//!   which aligns once and runs many parameter sets against the same series, and by the
//!   CLI, which may feed synthetic data instead of files.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use moodlab_core::{
    align_signals, run_backtest, AlignedSeries, BacktestError, PriceBar, SignalRecord,
    StrategyParams,
};

use crate::config::{run_id, BacktestConfig, RunId};
use crate::data_loader::{compute_dataset_hash, load_prices, load_signals, LoadError};
use crate::metrics::RunResult;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error(transparent)]
    Backtest(#[from] BacktestError),
    #[error("no price file configured")]
    MissingPrices,
}

/// Current schema version for persisted summaries.
pub const SCHEMA_VERSION: u32 = 1;

/// Input series fully materialized and aligned once.
///
/// Alignment failure is kept rather than returned so that a sweep can record it
/// against every combination and still complete.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub prices: Vec<PriceBar>,
    pub signal_count: usize,
    pub dataset_hash: String,
    aligned: Result<AlignedSeries, BacktestError>,
}

impl PreparedData {
    pub fn new(prices: Vec<PriceBar>, signals: &[SignalRecord]) -> Self {
        let dataset_hash = compute_dataset_hash(&prices, signals);
        let aligned = align_signals(&prices, signals);
        Self {
            prices,
            signal_count: signals.len(),
            dataset_hash,
            aligned,
        }
    }

    /// Load prices and (optionally) signals from CSV files.
    pub fn load(prices: &Path, signals: Option<&Path>) -> Result<Self, RunError> {
        let bars = load_prices(prices)?;
        let records = match signals {
            Some(path) => load_signals(path)?,
            None => Vec::new(),
        };
        Ok(Self::new(bars, &records))
    }

    pub fn bar_count(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// The aligned series, or the error alignment failed with.
    pub fn aligned(&self) -> Result<&AlignedSeries, &BacktestError> {
        self.aligned.as_ref()
    }
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub schema_version: u32,
    pub run_id: RunId,
    pub params: StrategyParams,
    pub metrics: RunResult,
    pub dataset_hash: String,
    pub bar_count: usize,
    pub signal_count: usize,
    pub warmup_skipped: usize,
    pub warnings: Vec<String>,
}

/// Run one parameter set against prepared data. No I/O.
pub fn run_prepared(data: &PreparedData, params: &StrategyParams) -> Result<BacktestResult, RunError> {
    let aligned = data.aligned().map_err(|e| RunError::Backtest(e.clone()))?;
    let simulation = run_backtest(&aligned.bars, params)?;
    let metrics = RunResult::evaluate(&simulation.trades, simulation.initial_capital);

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: run_id(params),
        params: params.clone(),
        metrics,
        dataset_hash: data.dataset_hash.clone(),
        bar_count: data.bar_count(),
        signal_count: data.signal_count,
        warmup_skipped: simulation.warmup_skipped,
        warnings: aligned.warnings.clone(),
    })
}

/// Run the base strategy of a config against the files it names.
pub fn run_single_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    let prices = config.data.prices.as_deref().ok_or(RunError::MissingPrices)?;
    let data = PreparedData::load(prices, config.data.signals.as_deref())?;
    let result = run_prepared(&data, &config.strategy)?;
    log_summary(&result);
    Ok(result)
}

pub fn log_summary(result: &BacktestResult) {
    let m = &result.metrics;
    info!(
        run_id = result.run_id.get(..12).unwrap_or(result.run_id.as_str()),
        bars = result.bar_count,
        trades = m.trade_count,
        final_balance = m.final_balance,
        roi_pct = m.roi_pct,
        win_rate = m.win_rate,
        max_drawdown_pct = m.max_drawdown_pct,
        sharpe = m.sharpe_ratio,
        "backtest complete"
    );
}
