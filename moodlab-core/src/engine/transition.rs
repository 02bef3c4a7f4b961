//! Per-bar transition rules as an ordered guard table.
//!
//! Each guard is a pure predicate over the current bar, the account and the
//! parameters. The table is scanned top to bottom and the first guard that holds
//! decides the bar. Stop-loss therefore beats take-profit when both hold.

use serde::{Deserialize, Serialize};

use crate::domain::{AlignedBar, Signal, DEFAULT_CONFIDENCE};

use super::params::StrategyParams;
use super::state::{EngineState, PositionState};

/// What the simulator does on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    StopLoss,
    TakeProfit,
    Enter,
    Exit,
    Hold,
}

/// A bar past warm-up: every value the guards read is defined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarmBar {
    pub close: f64,
    pub sma: f64,
    pub upper_band: f64,
    pub rsi: f64,
    pub atr: Option<f64>,
    pub signal: Option<Signal>,
    pub confidence: f64,
}

impl WarmBar {
    /// `None` while any of SMA, upper band or RSI is still undefined.
    pub fn from_aligned(bar: &AlignedBar) -> Option<Self> {
        Some(Self {
            close: bar.close(),
            sma: bar.sma?,
            upper_band: bar.upper_band?,
            rsi: bar.rsi?,
            atr: bar.atr,
            signal: bar.signal,
            confidence: bar.confidence.unwrap_or(DEFAULT_CONFIDENCE),
        })
    }
}

pub type Guard = fn(&WarmBar, &EngineState, &StrategyParams) -> bool;

/// Evaluation order matters: the first matching row wins.
pub const GUARD_TABLE: [(Decision, Guard); 4] = [
    (Decision::StopLoss, stop_loss_hit),
    (Decision::TakeProfit, take_profit_hit),
    (Decision::Enter, entry_allowed),
    (Decision::Exit, exit_allowed),
];

pub fn decide(bar: &WarmBar, state: &EngineState, params: &StrategyParams) -> Decision {
    GUARD_TABLE
        .iter()
        .find(|(_, guard)| guard(bar, state, params))
        .map(|(decision, _)| *decision)
        .unwrap_or(Decision::Hold)
}

/// Close fell to the percentage stop, or (ATR mode) below the ATR stop fixed at entry.
pub fn stop_loss_hit(bar: &WarmBar, state: &EngineState, params: &StrategyParams) -> bool {
    match state.position {
        PositionState::Long {
            entry_price,
            stop_level,
            ..
        } => {
            bar.close <= entry_price * (1.0 - params.stop_loss_pct)
                || (params.atr_multiplier.is_some() && bar.close < stop_level)
        }
        PositionState::Flat => false,
    }
}

pub fn take_profit_hit(bar: &WarmBar, state: &EngineState, _params: &StrategyParams) -> bool {
    match state.position {
        PositionState::Long {
            take_profit_level, ..
        } => bar.close >= take_profit_level,
        PositionState::Flat => false,
    }
}

/// Every condition must hold to open a position.
pub fn entry_allowed(bar: &WarmBar, state: &EngineState, params: &StrategyParams) -> bool {
    !state.position.is_long()
        && bar.signal == Some(Signal::Buy)
        && state.balance > 0.0
        && bar.confidence >= params.min_confidence
        && bar.close > bar.sma
        && bar.rsi < params.rsi_overbought
        && bar.rsi >= params.rsi_floor
        && bar.close < bar.upper_band
}

/// Any one condition is enough to leave on a SELL signal.
pub fn exit_allowed(bar: &WarmBar, state: &EngineState, params: &StrategyParams) -> bool {
    state.position.is_long()
        && bar.signal == Some(Signal::Sell)
        && (bar.confidence >= params.min_confidence
            || bar.close < bar.sma
            || bar.rsi > params.rsi_overbought
            || bar.close > bar.upper_band)
}

/// Stop level recorded at entry.
///
/// ATR mode uses `entry - multiplier * ATR`; otherwise the percentage stop. A missing
/// ATR falls back to the percentage stop.
pub fn stop_level(entry_price: f64, atr: Option<f64>, params: &StrategyParams) -> f64 {
    match (params.atr_multiplier, atr) {
        (Some(multiplier), Some(atr)) => entry_price - multiplier * atr,
        _ => entry_price * (1.0 - params.stop_loss_pct),
    }
}

pub fn take_profit_level(entry_price: f64, params: &StrategyParams) -> f64 {
    entry_price * (1.0 + params.take_profit_pct)
}
