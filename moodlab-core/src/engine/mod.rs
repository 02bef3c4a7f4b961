//! Strategy simulator: a FLAT/LONG state machine driven bar by bar.
//!
//! The simulator consumes aligned bars whose indicator values are precomputed and
//! emits an append-only trade log. Per bar, in this order:
//!
//! 1. LONG: stop-loss (percentage, or ATR stop in ATR mode)
//! 2. LONG: take-profit
//! 3. FLAT + BUY: entry, all conditions ANDed
//! 4. LONG + SELL: exit, conditions ORed
//!
//! The first rule that fires decides the bar. An open position is force-closed at
//! the last bar so every run ends in cash.

pub mod loop_runner;
pub mod params;
pub mod state;
pub mod transition;

pub use loop_runner::{run_backtest, simulate, Simulation, Simulator};
pub use params::StrategyParams;
pub use state::{EngineState, PositionState};
pub use transition::{decide, Decision, WarmBar, GUARD_TABLE};
