//! End-to-end engine scenarios through the public API: align, annotate, simulate.

use chrono::{Duration, NaiveDate};
use moodlab_core::{
    align_signals, run_backtest, PriceBar, Signal, SignalRecord, StrategyParams, TradeAction,
};

fn bars(closes: &[f64]) -> Vec<PriceBar> {
    let base = NaiveDate::from_ymd_opt(2024, 2, 1)
        .unwrap()
        .and_hms_opt(16, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            timestamp: base + Duration::days(i as i64),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 5_000.0,
        })
        .collect()
}

/// 21 alternating warm-up closes, an entry bar at 100.5, then `tail`.
fn closes_with_tail(tail: &[f64]) -> Vec<f64> {
    let mut closes: Vec<f64> = (0..21).map(|i| if i % 2 == 0 { 99.0 } else { 101.0 }).collect();
    closes.push(100.5);
    closes.extend_from_slice(tail);
    closes
}

#[test]
fn intraday_signal_lands_on_the_bar_before_it() {
    let prices = bars(&closes_with_tail(&[100.5; 8]));
    // Posted three hours after bar 21 closed: as-of matching puts it on bar 21.
    let signal = SignalRecord::new(prices[21].timestamp + Duration::hours(3), Signal::Buy)
        .with_confidence(0.8);
    let aligned = align_signals(&prices, &[signal]).unwrap();

    let sim = run_backtest(&aligned.bars, &StrategyParams::default()).unwrap();
    let actions: Vec<_> = sim.trades.iter().map(|t| t.action).collect();
    assert_eq!(actions, vec![TradeAction::Buy, TradeAction::FinalSell]);
    assert_eq!(sim.trades[0].timestamp, prices[21].timestamp);
    assert_eq!(sim.trades[1].timestamp, prices[29].timestamp);
}

#[test]
fn low_confidence_buy_is_not_taken() {
    let prices = bars(&closes_with_tail(&[100.5; 8]));
    let signal = SignalRecord::new(prices[21].timestamp, Signal::Buy).with_confidence(0.59);
    let aligned = align_signals(&prices, &[signal]).unwrap();

    let sim = run_backtest(&aligned.bars, &StrategyParams::default()).unwrap();
    assert!(sim.trades.is_empty());
    assert_eq!(sim.final_balance, 1000.0);
}

#[test]
fn stop_loss_fires_on_first_breaching_bar() {
    let prices = bars(&closes_with_tail(&[98.0, 96.0, 94.0, 90.0, 85.0]));
    let signal = SignalRecord::new(prices[21].timestamp, Signal::Buy);
    let aligned = align_signals(&prices, &[signal]).unwrap();

    let sim = run_backtest(&aligned.bars, &StrategyParams::default()).unwrap();
    // 100.5 * 0.95 = 95.475: 96 holds, 94 breaches
    assert_eq!(sim.trades[1].action, TradeAction::StopLoss);
    assert_eq!(sim.trades[1].price, 94.0);
    assert_eq!(sim.trades.len(), 2);
}

#[test]
fn take_profit_then_rejected_reentry() {
    let prices = bars(&closes_with_tail(&[112.0, 100.0, 100.0, 100.0]));
    let signals = vec![
        SignalRecord::new(prices[21].timestamp, Signal::Buy),
        SignalRecord::new(prices[24].timestamp, Signal::Buy),
    ];
    let aligned = align_signals(&prices, &signals).unwrap();
    let sim = run_backtest(&aligned.bars, &StrategyParams::default()).unwrap();

    assert_eq!(sim.trades[1].action, TradeAction::TakeProfit);
    // The second BUY lands below the moving average (about 100.6) and is refused.
    assert_eq!(sim.trades.len(), 2);
}
