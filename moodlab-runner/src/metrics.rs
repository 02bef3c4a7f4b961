//! Performance evaluator: pure functions over a trade log.
//!
//! Every metric is derived from the trade sequence and the initial balance alone;
//! price bars are never consulted. Closing trades are paired with the BUY that
//! immediately precedes them.

use serde::{Deserialize, Serialize};

use moodlab_core::{Trade, TradeAction};

/// Trading days per year used to annualize the Sharpe ratio.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Metrics and trade log for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub final_balance: f64,
    pub roi_pct: f64,
    /// Fraction of closed round trips that exited above their entry.
    pub win_rate: f64,
    /// Positive percentage.
    pub max_drawdown_pct: f64,
    /// `f64::INFINITY` when there is gross profit and no gross loss.
    pub profit_factor: f64,
    pub sharpe_ratio: f64,
    /// Closed round trips.
    pub trade_count: usize,
    pub trades: Vec<Trade>,
}

impl RunResult {
    pub fn evaluate(trades: &[Trade], initial_balance: f64) -> Self {
        let final_balance = final_balance(trades, initial_balance);
        Self {
            final_balance,
            roi_pct: roi_pct(final_balance, initial_balance),
            win_rate: win_rate(trades),
            max_drawdown_pct: max_drawdown_pct(trades, initial_balance),
            profit_factor: profit_factor(trades),
            sharpe_ratio: sharpe_ratio(trades),
            trade_count: round_trips(trades).count(),
            trades: trades.to_vec(),
        }
    }

    /// All-zero result for a run that could not trade.
    pub fn empty(initial_balance: f64) -> Self {
        Self::evaluate(&[], initial_balance)
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// (entry, exit) pairs: each closing trade with the BUY right before it.
///
/// A closing trade not preceded by a BUY is skipped.
pub fn round_trips(trades: &[Trade]) -> impl Iterator<Item = (&Trade, &Trade)> {
    trades.windows(2).filter_map(|w| {
        (w[0].action == TradeAction::Buy && w[1].action.is_closing()).then_some((&w[0], &w[1]))
    })
}

/// Replay the all-in conversions to recover the ending cash balance.
///
/// A trailing open BUY (a log that was cut short) is valued at its entry price.
pub fn final_balance(trades: &[Trade], initial_balance: f64) -> f64 {
    let mut balance = initial_balance;
    let mut holdings: Option<f64> = None;
    for trade in trades {
        match (trade.action.is_opening(), holdings) {
            (true, None) if trade.price > 0.0 => {
                holdings = Some(balance / trade.price);
            }
            (false, Some(units)) => {
                balance = units * trade.price;
                holdings = None;
            }
            _ => {}
        }
    }
    balance
}

pub fn roi_pct(final_balance: f64, initial_balance: f64) -> f64 {
    if initial_balance <= 0.0 {
        return 0.0;
    }
    (final_balance - initial_balance) / initial_balance * 100.0
}

/// Fraction of round trips whose exit price beats the entry price. 0 with none.
pub fn win_rate(trades: &[Trade]) -> f64 {
    let (wins, total) = round_trips(trades).fold((0usize, 0usize), |(w, n), (entry, exit)| {
        (w + usize::from(exit.price > entry.price), n + 1)
    });
    wins as f64 / total.max(1) as f64
}

/// Largest peak-to-trough decline of the BUY-event equity curve, as a positive percentage.
///
/// Each BUY is valued at `initial * price / first_buy_price`; the peak starts at
/// the initial balance.
pub fn max_drawdown_pct(trades: &[Trade], initial_balance: f64) -> f64 {
    let mut buys = trades.iter().filter(|t| t.action.is_opening());
    let Some(first) = buys.next() else {
        return 0.0;
    };
    if first.price <= 0.0 || initial_balance <= 0.0 {
        return 0.0;
    }

    let mut peak = initial_balance;
    let mut max_dd = 0.0_f64;
    for buy in std::iter::once(first).chain(buys) {
        let value = initial_balance * (buy.price / first.price);
        max_dd = max_dd.max((peak - value) / peak);
        peak = peak.max(value);
    }
    max_dd * 100.0
}

/// Gross profit over gross loss from per-round-trip price deltas.
///
/// Gross loss is floored at 1. Gross profit with no loss at all is reported as
/// infinite; no profit and no loss is 0.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let (gross_profit, gross_loss) =
        round_trips(trades).fold((0.0_f64, 0.0_f64), |(gp, gl), (entry, exit)| {
            let delta = exit.price - entry.price;
            if delta > 0.0 {
                (gp + delta, gl)
            } else {
                (gp, gl + delta.abs())
            }
        });

    if gross_loss == 0.0 {
        return if gross_profit > 0.0 { f64::INFINITY } else { 0.0 };
    }
    gross_profit / gross_loss.max(1.0)
}

/// Annualized Sharpe ratio of the trade-price series.
///
/// Sharpe = mean(pct change) / sample std(pct change) * sqrt(252).
/// Returns 0.0 with fewer than two returns or zero deviation.
pub fn sharpe_ratio(trades: &[Trade]) -> f64 {
    let returns: Vec<f64> = trades
        .windows(2)
        .filter(|w| w[0].price > 0.0)
        .map(|w| w[1].price / w[0].price - 1.0)
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

// ─── Helpers ────────────────────────────────────────────────────────

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (divides by N-1).
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn log(entries: &[(TradeAction, f64)]) -> Vec<Trade> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        entries
            .iter()
            .enumerate()
            .map(|(i, &(action, price))| {
                let ts = base + Duration::days(i as i64);
                if action.is_opening() {
                    Trade::open(ts, price, price * 0.95)
                } else {
                    Trade::close(action, ts, price)
                }
            })
            .collect()
    }

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "actual={actual}, expected={expected}"
        );
    }

    #[test]
    fn empty_log_is_all_zero() {
        let r = RunResult::empty(1000.0);
        assert_eq!(r.final_balance, 1000.0);
        assert_eq!(r.roi_pct, 0.0);
        assert_eq!(r.win_rate, 0.0);
        assert_eq!(r.max_drawdown_pct, 0.0);
        assert_eq!(r.profit_factor, 0.0);
        assert_eq!(r.sharpe_ratio, 0.0);
        assert_eq!(r.trade_count, 0);
    }

    #[test]
    fn final_balance_replays_conversions() {
        let trades = log(&[
            (TradeAction::Buy, 100.0),
            (TradeAction::TakeProfit, 110.0),
            (TradeAction::Buy, 50.0),
            (TradeAction::StopLoss, 45.0),
        ]);
        // 1000 -> 10 units -> 1100 -> 22 units -> 990
        assert_approx(final_balance(&trades, 1000.0), 990.0);
        assert_approx(roi_pct(990.0, 1000.0), -1.0);
    }

    #[test]
    fn win_rate_counts_every_closing_kind() {
        let trades = log(&[
            (TradeAction::Buy, 100.0),
            (TradeAction::Sell, 105.0),
            (TradeAction::Buy, 100.0),
            (TradeAction::StopLoss, 90.0),
            (TradeAction::Buy, 100.0),
            (TradeAction::FinalSell, 101.0),
        ]);
        assert_approx(win_rate(&trades), 2.0 / 3.0);
        assert_eq!(round_trips(&trades).count(), 3);
    }

    #[test]
    fn orphan_close_is_ignored() {
        let trades = log(&[(TradeAction::Sell, 105.0), (TradeAction::Sell, 110.0)]);
        assert_eq!(win_rate(&trades), 0.0);
        assert_eq!(profit_factor(&trades), 0.0);
        assert_eq!(final_balance(&trades, 1000.0), 1000.0);
    }

    #[test]
    fn drawdown_from_buy_events() {
        let trades = log(&[
            (TradeAction::Buy, 100.0),
            (TradeAction::Sell, 120.0),
            (TradeAction::Buy, 120.0),
            (TradeAction::Sell, 90.0),
            (TradeAction::Buy, 90.0),
            (TradeAction::FinalSell, 95.0),
        ]);
        // BUY values: 1000, 1200, 900 -> peak 1200, trough 900 -> 25%
        assert_approx(max_drawdown_pct(&trades, 1000.0), 25.0);
    }

    #[test]
    fn drawdown_zero_when_buys_rise() {
        let trades = log(&[
            (TradeAction::Buy, 100.0),
            (TradeAction::Sell, 101.0),
            (TradeAction::Buy, 102.0),
            (TradeAction::Sell, 103.0),
        ]);
        assert_eq!(max_drawdown_pct(&trades, 1000.0), 0.0);
    }

    #[test]
    fn profit_factor_floors_loss_at_one() {
        let trades = log(&[
            (TradeAction::Buy, 100.0),
            (TradeAction::Sell, 103.0),
            (TradeAction::Buy, 100.0),
            (TradeAction::StopLoss, 99.5),
        ]);
        // GP 3, GL 0.5 floored to 1
        assert_approx(profit_factor(&trades), 3.0);

        let trades = log(&[
            (TradeAction::Buy, 100.0),
            (TradeAction::Sell, 110.0),
            (TradeAction::Buy, 100.0),
            (TradeAction::StopLoss, 95.0),
        ]);
        assert_approx(profit_factor(&trades), 2.0);
    }

    #[test]
    fn profit_factor_infinite_without_losses() {
        let trades = log(&[(TradeAction::Buy, 100.0), (TradeAction::TakeProfit, 110.0)]);
        assert!(profit_factor(&trades).is_infinite());
    }

    #[test]
    fn flat_round_trip_has_zero_profit_factor() {
        let trades = log(&[(TradeAction::Buy, 100.0), (TradeAction::FinalSell, 100.0)]);
        assert_eq!(profit_factor(&trades), 0.0);
    }

    #[test]
    fn sharpe_needs_two_returns() {
        let trades = log(&[(TradeAction::Buy, 100.0), (TradeAction::Sell, 110.0)]);
        assert_eq!(sharpe_ratio(&trades), 0.0);
    }

    #[test]
    fn sharpe_is_annualized() {
        let trades = log(&[
            (TradeAction::Buy, 100.0),
            (TradeAction::Sell, 110.0),
            (TradeAction::Buy, 99.0),
        ]);
        // returns 0.10 and -0.10: mean 0 -> 0
        assert_approx(sharpe_ratio(&trades), 0.0);

        let trades = log(&[
            (TradeAction::Buy, 100.0),
            (TradeAction::Sell, 110.0),
            (TradeAction::Buy, 132.0),
        ]);
        // returns 0.1 and 0.2: mean 0.15, sample std 0.0707...
        let expected = 0.15 / (0.005_f64).sqrt() * 252.0_f64.sqrt();
        assert!((sharpe_ratio(&trades) - expected).abs() < 1e-6);
    }

    #[test]
    fn trade_count_is_round_trips() {
        let trades = log(&[
            (TradeAction::Buy, 100.0),
            (TradeAction::Sell, 101.0),
            (TradeAction::Buy, 100.0),
            (TradeAction::FinalSell, 99.0),
        ]);
        let r = RunResult::evaluate(&trades, 1000.0);
        assert_eq!(r.trade_count, 2);
        assert_eq!(r.trades.len(), 4);
    }
}
