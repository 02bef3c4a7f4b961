//! Bar-by-bar simulation loop.
//!
//! The loop is a strict sequential fold over time-ordered aligned bars:
//! 1. Check ordering and the close price of the bar
//! 2. Skip the bar while indicators are still warming up
//! 3. Consult the guard table and apply the decision
//! 4. After the last bar, force-close any open position (FINAL_SELL)

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{AlignedBar, Timestamp, Trade, TradeAction};
use crate::error::{BacktestError, Result};
use crate::indicators::compute_indicators;

use super::params::StrategyParams;
use super::state::EngineState;
use super::transition::{decide, stop_level, take_profit_level, Decision, WarmBar};

/// Outcome of one simulation: the trade log and the cash it ended with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub trades: Vec<Trade>,
    pub initial_capital: f64,
    pub final_balance: f64,
    pub bars_processed: usize,
    /// Bars skipped because indicators were not yet defined.
    pub warmup_skipped: usize,
}

/// Step-wise simulator. Owns the account and trade log for exactly one run.
pub struct Simulator<'a> {
    params: &'a StrategyParams,
    state: EngineState,
    trades: Vec<Trade>,
    last_bar: Option<(Timestamp, f64)>,
    bars_processed: usize,
    warmup_skipped: usize,
}

impl<'a> Simulator<'a> {
    pub fn new(params: &'a StrategyParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            state: EngineState::new(params.initial_capital),
            trades: Vec::new(),
            last_bar: None,
            bars_processed: 0,
            warmup_skipped: 0,
        })
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Process bar `index` and return the decision taken on it.
    pub fn step(&mut self, index: usize, bar: &AlignedBar) -> Result<Decision> {
        let close = bar.close();
        if !(close.is_finite() && close > 0.0) {
            return Err(BacktestError::malformed(
                index,
                format!("close must be a positive finite number, got {close}"),
            ));
        }
        if let Some((prev, _)) = self.last_bar {
            if bar.timestamp() <= prev {
                return Err(BacktestError::malformed(
                    index,
                    format!("timestamp {} is not after previous bar {prev}", bar.timestamp()),
                ));
            }
        }
        self.last_bar = Some((bar.timestamp(), close));
        self.state.bar_index = index;
        self.bars_processed += 1;

        let warm = match WarmBar::from_aligned(bar) {
            Some(warm) if index >= self.params.warmup_bars() => warm,
            _ => {
                self.warmup_skipped += 1;
                return Ok(Decision::Hold);
            }
        };

        let decision = decide(&warm, &self.state, self.params);
        match decision {
            Decision::StopLoss => self.close_position(TradeAction::StopLoss, bar.timestamp(), close),
            Decision::TakeProfit => {
                self.close_position(TradeAction::TakeProfit, bar.timestamp(), close)
            }
            Decision::Exit => self.close_position(TradeAction::Sell, bar.timestamp(), close),
            Decision::Enter => {
                let stop = stop_level(close, warm.atr, self.params);
                self.state
                    .enter(close, stop, take_profit_level(close, self.params));
                self.record(Trade::open(bar.timestamp(), close, stop));
            }
            Decision::Hold => {}
        }
        Ok(decision)
    }

    /// Close any open position at the last bar seen and return the result.
    pub fn finish(mut self) -> Simulation {
        if self.state.position.is_long() {
            if let Some((timestamp, close)) = self.last_bar {
                self.close_position(TradeAction::FinalSell, timestamp, close);
            }
        }
        Simulation {
            trades: self.trades,
            initial_capital: self.params.initial_capital,
            final_balance: self.state.balance,
            bars_processed: self.bars_processed,
            warmup_skipped: self.warmup_skipped,
        }
    }

    fn close_position(&mut self, action: TradeAction, timestamp: Timestamp, price: f64) {
        self.state.exit(price);
        self.record(Trade::close(action, timestamp, price));
    }

    fn record(&mut self, trade: Trade) {
        debug!(
            bar = self.state.bar_index,
            action = %trade.action,
            price = trade.price,
            equity = self.state.equity(trade.price),
            timestamp = %trade.timestamp,
            "trade"
        );
        self.trades.push(trade);
    }
}

/// Run the simulator over bars that already carry their indicator values.
pub fn simulate(bars: &[AlignedBar], params: &StrategyParams) -> Result<Simulation> {
    let mut sim = Simulator::new(params)?;
    if bars.len() <= params.warmup_bars() {
        warn!(
            bars = bars.len(),
            warmup = params.warmup_bars(),
            "series shorter than warm-up, no trades possible"
        );
    }
    for (i, bar) in bars.iter().enumerate() {
        sim.step(i, bar)?;
    }
    Ok(sim.finish())
}

/// Compute indicators for `params` on a copy of `bars`, then simulate.
///
/// `bars` only needs price and signal fields; any indicator values already present
/// are overwritten.
pub fn run_backtest(bars: &[AlignedBar], params: &StrategyParams) -> Result<Simulation> {
    params.validate()?;
    let prices: Vec<_> = bars.iter().map(|b| b.bar.clone()).collect();
    let indicators = compute_indicators(&prices, params.ma_window, params.indicator_period)?;
    let mut annotated = bars.to_vec();
    indicators.annotate(&mut annotated);
    simulate(&annotated, params)
}
