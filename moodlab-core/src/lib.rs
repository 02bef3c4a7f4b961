//! MoodLab Core: domain types, indicators, alignment and the strategy simulator.
//!
//! This crate holds the algorithmic part of a sentiment-signal backtest:
//! - Domain types (price bars, signal records, aligned bars, trades)
//! - Indicator engine (SMA, sample STD, Bollinger bands, simple-mean RSI, ATR)
//! - As-of aligner joining signals onto price bars
//! - FLAT/LONG simulator driven by an ordered guard table
//! - Sentiment-trend signal generator
//!
//! Nothing here performs I/O.

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod signals;

pub use data::{align_signals, validate_price_series, AlignedSeries};
pub use domain::{AlignedBar, PriceBar, Signal, SignalRecord, Timestamp, Trade, TradeAction};
pub use engine::{run_backtest, simulate, Simulation, Simulator, StrategyParams};
pub use error::{BacktestError, Result};
pub use indicators::{compute_indicators, IndicatorSet};
