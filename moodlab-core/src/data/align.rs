//! As-of alignment of signal records onto price bars.
//!
//! Each signal lands on the most recent bar whose timestamp is at or before the
//! signal's own timestamp (backward match). Signals older than the first bar are
//! dropped with a warning. When several signals land on one bar, the latest one wins.
//! The output has exactly one entry per price bar.

use tracing::warn;

use crate::domain::{AlignedBar, PriceBar, SignalRecord};
use crate::error::Result;

use super::validate::validate_price_series;

/// Price bars with their as-of signals attached, plus what alignment had to discard.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    pub bars: Vec<AlignedBar>,
    /// Human-readable notes for every dropped signal.
    pub warnings: Vec<String>,
    /// Signals that preceded the first price bar.
    pub dropped: usize,
    /// Signals replaced by a later signal on the same bar.
    pub superseded: usize,
}

impl AlignedSeries {
    /// Number of bars carrying a signal.
    pub fn matched(&self) -> usize {
        self.bars.iter().filter(|b| b.signal.is_some()).count()
    }
}

/// Join `signals` onto `prices` with a backward as-of match.
///
/// `prices` must be strictly time-ordered; `signals` may arrive in any order and are
/// sorted (stably) first, so among equal timestamps the later record wins.
pub fn align_signals(prices: &[PriceBar], signals: &[SignalRecord]) -> Result<AlignedSeries> {
    validate_price_series(prices)?;

    let mut bars: Vec<AlignedBar> = prices.iter().cloned().map(AlignedBar::bare).collect();
    let mut sorted: Vec<&SignalRecord> = signals.iter().collect();
    sorted.sort_by_key(|s| s.timestamp);

    let mut warnings = Vec::new();
    let mut dropped = 0;
    let mut superseded = 0;

    for signal in sorted {
        let idx = prices.partition_point(|bar| bar.timestamp <= signal.timestamp);
        if idx == 0 {
            let msg = format!(
                "dropped {} signal at {}: precedes first price bar",
                signal.signal, signal.timestamp
            );
            warn!("{msg}");
            warnings.push(msg);
            dropped += 1;
            continue;
        }

        let slot = &mut bars[idx - 1];
        if slot.signal.is_some() {
            superseded += 1;
        }
        slot.signal = Some(signal.signal);
        slot.confidence = Some(signal.effective_confidence());
    }

    Ok(AlignedSeries {
        bars,
        warnings,
        dropped,
        superseded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Signal;
    use crate::error::BacktestError;
    use crate::indicators::make_bars;
    use chrono::Duration;

    #[test]
    fn exact_timestamp_matches_that_bar() {
        let prices = make_bars(&[10.0, 11.0, 12.0]);
        let signals = vec![SignalRecord::new(prices[1].timestamp, Signal::Buy)];
        let aligned = align_signals(&prices, &signals).unwrap();

        assert_eq!(aligned.bars.len(), 3);
        assert_eq!(aligned.bars[0].signal, None);
        assert_eq!(aligned.bars[1].signal, Some(Signal::Buy));
        assert_eq!(aligned.bars[2].signal, None);
    }

    #[test]
    fn signal_between_bars_matches_earlier_bar() {
        let prices = make_bars(&[10.0, 11.0, 12.0]);
        let ts = prices[1].timestamp + Duration::hours(6);
        let aligned = align_signals(&prices, &[SignalRecord::new(ts, Signal::Sell)]).unwrap();
        assert_eq!(aligned.bars[1].signal, Some(Signal::Sell));
        assert_eq!(aligned.matched(), 1);
    }

    #[test]
    fn signal_after_last_bar_matches_last_bar() {
        let prices = make_bars(&[10.0, 11.0]);
        let ts = prices[1].timestamp + Duration::days(30);
        let aligned = align_signals(&prices, &[SignalRecord::new(ts, Signal::Buy)]).unwrap();
        assert_eq!(aligned.bars[1].signal, Some(Signal::Buy));
    }

    #[test]
    fn early_signal_is_dropped_with_warning() {
        let prices = make_bars(&[10.0, 11.0]);
        let ts = prices[0].timestamp - Duration::minutes(1);
        let aligned = align_signals(&prices, &[SignalRecord::new(ts, Signal::Buy)]).unwrap();
        assert_eq!(aligned.dropped, 1);
        assert_eq!(aligned.warnings.len(), 1);
        assert_eq!(aligned.matched(), 0);
    }

    #[test]
    fn latest_signal_on_a_bar_wins() {
        let prices = make_bars(&[10.0, 11.0, 12.0]);
        let t = prices[1].timestamp;
        // Out of input order on purpose: alignment sorts by timestamp first.
        let signals = vec![
            SignalRecord::new(t + Duration::hours(3), Signal::Sell).with_confidence(0.7),
            SignalRecord::new(t + Duration::hours(1), Signal::Buy).with_confidence(0.9),
        ];
        let aligned = align_signals(&prices, &signals).unwrap();
        assert_eq!(aligned.bars[1].signal, Some(Signal::Sell));
        assert_eq!(aligned.bars[1].confidence, Some(0.7));
        assert_eq!(aligned.superseded, 1);
    }

    #[test]
    fn missing_confidence_becomes_full() {
        let prices = make_bars(&[10.0]);
        let aligned =
            align_signals(&prices, &[SignalRecord::new(prices[0].timestamp, Signal::Buy)])
                .unwrap();
        assert_eq!(aligned.bars[0].confidence, Some(1.0));
    }

    #[test]
    fn unordered_prices_are_rejected() {
        let mut prices = make_bars(&[10.0, 11.0, 12.0]);
        prices.swap(1, 2);
        assert!(matches!(
            align_signals(&prices, &[]),
            Err(BacktestError::MalformedSeries { .. })
        ));
    }

    #[test]
    fn no_signals_keeps_every_bar() {
        let prices = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        let aligned = align_signals(&prices, &[]).unwrap();
        assert_eq!(aligned.bars.len(), 4);
        assert_eq!(aligned.matched(), 0);
        assert!(aligned.warnings.is_empty());
    }
}
