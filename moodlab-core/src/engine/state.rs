//! Position state and the all-in account it lives in.

use serde::{Deserialize, Serialize};

/// FLAT or LONG. There are no short positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PositionState {
    Flat,
    Long {
        entry_price: f64,
        /// Fixed when the position opens.
        stop_level: f64,
        take_profit_level: f64,
    },
}

impl PositionState {
    pub fn is_long(&self) -> bool {
        matches!(self, PositionState::Long { .. })
    }
}

/// Cash and holdings for one run. Funds are either all cash or all position.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub balance: f64,
    pub holdings: f64,
    pub position: PositionState,
    pub bar_index: usize,
}

impl EngineState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            balance: initial_capital,
            holdings: 0.0,
            position: PositionState::Flat,
            bar_index: 0,
        }
    }

    /// Convert the whole balance into holdings at `price`.
    pub fn enter(&mut self, price: f64, stop_level: f64, take_profit_level: f64) {
        debug_assert!(!self.position.is_long(), "enter while already long");
        self.holdings = self.balance / price;
        self.balance = 0.0;
        self.position = PositionState::Long {
            entry_price: price,
            stop_level,
            take_profit_level,
        };
    }

    /// Liquidate all holdings at `price`. Returns the new balance.
    pub fn exit(&mut self, price: f64) -> f64 {
        debug_assert!(self.position.is_long(), "exit while flat");
        self.balance = self.holdings * price;
        self.holdings = 0.0;
        self.position = PositionState::Flat;
        self.balance
    }

    /// Value of the account marked at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.balance + self.holdings * price
    }

    /// `holdings > 0` exactly when `balance == 0`, and the position state agrees.
    pub fn is_exclusive(&self) -> bool {
        match self.position {
            PositionState::Flat => self.holdings == 0.0 && self.balance > 0.0,
            PositionState::Long { .. } => self.holdings > 0.0 && self.balance == 0.0,
        }
    }
}
