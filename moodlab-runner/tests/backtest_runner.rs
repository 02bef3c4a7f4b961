//! Integration tests for the runner: CSV files on disk through to metrics and artifacts.

use std::fmt::Write as _;
use std::path::Path;

use moodlab_core::{BacktestError, TradeAction};
use moodlab_runner::config::BacktestConfig;
use moodlab_runner::data_loader::{load_trades, LoadError};
use moodlab_runner::export::save_artifacts;
use moodlab_runner::metrics::RunResult;
use moodlab_runner::runner::{run_single_backtest, RunError};

/// 21 alternating warm-up closes, 100.5 at bar 21, then 100.5 to bar 29.
fn flat_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..21).map(|i| if i % 2 == 0 { 99.0 } else { 101.0 }).collect();
    closes.extend(std::iter::repeat(100.5).take(9));
    closes
}

fn prices_csv(closes: &[f64]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for (i, c) in closes.iter().enumerate() {
        writeln!(
            out,
            "2024-03-{:02} 16:00:00,{c},{},{},{c},12000",
            i + 1,
            c + 0.5,
            c - 0.5
        )
        .unwrap();
    }
    out
}

fn write_config(dir: &Path, prices: &str, signals: &str, extra: &str) -> BacktestConfig {
    let prices_path = dir.join("prices.csv");
    let signals_path = dir.join("signals.csv");
    std::fs::write(&prices_path, prices).unwrap();
    std::fs::write(&signals_path, signals).unwrap();
    let toml = format!(
        "[data]\nprices = {:?}\nsignals = {:?}\n\n{extra}",
        prices_path.display().to_string(),
        signals_path.display().to_string()
    );
    BacktestConfig::from_toml(&toml).unwrap()
}

#[test]
fn flat_series_buy_then_final_sell_at_zero_roi() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        &prices_csv(&flat_closes()),
        "timestamp,signal,confidence\n2024-03-22 16:00:00,BUY,0.9\n",
        "",
    );

    let result = run_single_backtest(&config).unwrap();
    let trades = &result.metrics.trades;
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].action, TradeAction::Buy);
    assert_eq!(trades[1].action, TradeAction::FinalSell);
    assert_eq!(trades[1].price, 100.5);
    assert!(result.metrics.roi_pct.abs() < 1e-9);
    assert!((result.metrics.final_balance - 1000.0).abs() < 1e-9);
    assert_eq!(result.metrics.trade_count, 1);
    assert_eq!(result.bar_count, 30);
    assert_eq!(result.signal_count, 1);
}

#[test]
fn signal_before_first_bar_is_dropped_with_warning() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        &prices_csv(&flat_closes()),
        "timestamp,signal\n2024-02-28 09:00:00,BUY\n",
        "",
    );
    let result = run_single_backtest(&config).unwrap();
    assert!(result.metrics.trades.is_empty());
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("precedes first price bar"));
}

#[test]
fn missing_close_column_is_data_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "timestamp,open,high,low,volume\n2024-03-01 16:00:00,1,2,0.5,10\n",
        "timestamp,signal\n",
        "",
    );
    let err = run_single_backtest(&config).unwrap_err();
    match err {
        RunError::Load(LoadError::Data(BacktestError::DataFormat { column, .. })) => {
            assert_eq!(column, "close")
        }
        other => panic!("expected DataFormat, got {other:?}"),
    }
}

#[test]
fn out_of_order_prices_are_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let prices = "timestamp,open,high,low,close,volume\n\
                  2024-03-02 16:00:00,10,11,9,10,100\n\
                  2024-03-01 16:00:00,10,11,9,10,100\n";
    let config = write_config(dir.path(), prices, "timestamp,signal\n", "");
    let err = run_single_backtest(&config).unwrap_err();
    assert!(matches!(
        err,
        RunError::Backtest(BacktestError::MalformedSeries { row: 1, .. })
    ));
}

#[test]
fn short_series_gives_zero_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        &prices_csv(&[100.0, 101.0, 102.0]),
        "timestamp,signal\n2024-03-02 16:00:00,BUY\n",
        "",
    );
    let result = run_single_backtest(&config).unwrap();
    assert_eq!(result.metrics, RunResult::empty(1000.0));
}

#[test]
fn strategy_section_reaches_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    // At bar 24 close sits above the SMA (100.1), RSI is about 53 and the band is
    // wide, so the SELL exits on its confidence leg alone.
    let signals = "timestamp,signal,confidence\n\
                   2024-03-22 16:00:00,BUY,0.9\n\
                   2024-03-25 16:00:00,SELL,0.7\n";
    let actions = |extra: &str| -> Vec<TradeAction> {
        let config = write_config(dir.path(), &prices_csv(&flat_closes()), signals, extra);
        run_single_backtest(&config)
            .unwrap()
            .metrics
            .trades
            .iter()
            .map(|t| t.action)
            .collect()
    };

    assert_eq!(actions(""), vec![TradeAction::Buy, TradeAction::Sell]);
    assert_eq!(
        actions("[strategy]\nmin_confidence = 0.8\n"),
        vec![TradeAction::Buy, TradeAction::FinalSell]
    );
}

#[test]
fn artifacts_round_trip_through_trade_loader() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        &prices_csv(&flat_closes()),
        "timestamp,signal\n2024-03-22 16:00:00,BUY\n",
        "",
    );
    let result = run_single_backtest(&config).unwrap();
    let run_dir = save_artifacts(&result, &dir.path().join("out")).unwrap();

    let trades = load_trades(&run_dir.join("trades.csv")).unwrap();
    assert_eq!(trades, result.metrics.trades);
    let evaluated = RunResult::evaluate(&trades, result.params.initial_capital);
    assert_eq!(evaluated, result.metrics);
}
