//! Trades: entries in the append-only trade log.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Timestamp;

/// What a trade did. `Buy` opens a position; every other action closes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Buy,
    Sell,
    StopLoss,
    TakeProfit,
    /// Forced liquidation at the last bar of the series.
    FinalSell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
            TradeAction::StopLoss => "STOP_LOSS",
            TradeAction::TakeProfit => "TAKE_PROFIT",
            TradeAction::FinalSell => "FINAL_SELL",
        }
    }

    pub fn is_opening(&self) -> bool {
        matches!(self, TradeAction::Buy)
    }

    pub fn is_closing(&self) -> bool {
        !self.is_opening()
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(TradeAction::Buy),
            "SELL" => Ok(TradeAction::Sell),
            "STOP_LOSS" => Ok(TradeAction::StopLoss),
            "TAKE_PROFIT" => Ok(TradeAction::TakeProfit),
            "FINAL_SELL" => Ok(TradeAction::FinalSell),
            other => Err(format!("unknown trade action '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub action: TradeAction,
    pub timestamp: Timestamp,
    pub price: f64,
    /// Stop level fixed when the position was opened. Only set on `Buy`.
    pub stop_loss: Option<f64>,
}

impl Trade {
    pub fn open(timestamp: Timestamp, price: f64, stop_loss: f64) -> Self {
        Self {
            action: TradeAction::Buy,
            timestamp,
            price,
            stop_loss: Some(stop_loss),
        }
    }

    pub fn close(action: TradeAction, timestamp: Timestamp, price: f64) -> Self {
        debug_assert!(action.is_closing(), "close() called with {action}");
        Self {
            action,
            timestamp,
            price,
            stop_loss: None,
        }
    }
}
