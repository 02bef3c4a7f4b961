//! MoodLab Runner: the backtest pipeline around `moodlab-core`.
//!
//! This crate builds on `moodlab-core` to provide:
//! - CSV loading for prices, signals, sentiment and trade logs
//! - TOML configuration
//! - Single-backtest runner (align, annotate, simulate, evaluate)
//! - Performance metrics from a trade log
//! - Parallel parameter sweeps
//! - CSV/JSON export and run artifacts
//! - Seeded synthetic data

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;
pub mod synthetic;

pub use config::{run_id, BacktestConfig, ConfigError, RunId};
pub use data_loader::{
    compute_dataset_hash, load_prices, load_sentiment, load_signals, load_trades, LoadError,
};
pub use metrics::RunResult;
pub use runner::{run_prepared, run_single_backtest, BacktestResult, PreparedData, RunError};
pub use sweep::{ParamSweep, SweepAxes, SweepError, SweepResults, SweepRow};
pub use synthetic::{synthetic_prices, synthetic_signals};
