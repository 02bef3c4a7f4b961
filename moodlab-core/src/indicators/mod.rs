//! Indicator engine: rolling statistics over a price series.
//!
//! Every indicator is a pure function of the bar series: bars in, one value per bar out.
//! Values are `None` while the lookback window is not yet full and are never zero-filled.
//! ATR is the one exception: it averages whatever true ranges are available so it can
//! back a stop level from the very first bar.
//!
//! `compute_indicators` runs the whole set once before the bar loop; the simulator only
//! reads the precomputed values.

pub mod atr;
pub mod bollinger;
pub mod rsi;
pub mod sma;

pub use atr::Atr;
pub use bollinger::{Bollinger, BollingerBand};
pub use rsi::Rsi;
pub use sma::Sma;

use crate::domain::{AlignedBar, PriceBar};
use crate::error::{BacktestError, Result};
use tracing::debug;

/// Default RSI/ATR period.
pub const DEFAULT_PERIOD: usize = 14;

/// Band half-width in standard deviations.
pub const BAND_MULTIPLIER: f64 = 2.0;

/// Trait for single-series indicators.
///
/// `compute` returns a vector of the same length as `bars`. Entries before
/// `lookback()` are `None` unless the indicator documents otherwise.
///
/// # Look-ahead guard
/// No value at bar t may depend on bar t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of bars before the first defined value.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[PriceBar]) -> Vec<Option<f64>>;
}

/// The full indicator set for one series, one entry per bar.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub sma: Vec<Option<f64>>,
    pub std: Vec<Option<f64>>,
    pub upper_band: Vec<Option<f64>>,
    pub lower_band: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
    pub atr: Vec<Option<f64>>,
}

impl IndicatorSet {
    pub fn len(&self) -> usize {
        self.sma.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sma.is_empty()
    }

    /// Copy the indicator values onto aligned bars of the same series.
    pub fn annotate(&self, bars: &mut [AlignedBar]) {
        debug_assert_eq!(bars.len(), self.len(), "indicator set built for another series");
        for (i, bar) in bars.iter_mut().enumerate() {
            bar.sma = self.sma[i];
            bar.std = self.std[i];
            bar.upper_band = self.upper_band[i];
            bar.lower_band = self.lower_band[i];
            bar.rsi = self.rsi[i];
            bar.atr = self.atr[i];
        }
    }
}

/// Compute SMA, STD, Bollinger bands, RSI and ATR for a series.
///
/// `window` drives the moving average and bands, `period` drives RSI and ATR.
/// Fails only when the series is empty.
pub fn compute_indicators(bars: &[PriceBar], window: usize, period: usize) -> Result<IndicatorSet> {
    if bars.is_empty() {
        return Err(BacktestError::InsufficientData(
            "cannot compute indicators on an empty series".into(),
        ));
    }
    if window < 2 {
        return Err(BacktestError::InvalidParameters(format!(
            "moving-average window must be >= 2, got {window}"
        )));
    }
    if period < 1 {
        return Err(BacktestError::InvalidParameters(
            "indicator period must be >= 1".into(),
        ));
    }

    let sma = Sma::new(window);
    let std_dev = Bollinger::std_dev(window);
    let upper = Bollinger::upper(window, BAND_MULTIPLIER);
    let lower = Bollinger::lower(window, BAND_MULTIPLIER);
    let rsi = Rsi::new(period);
    let atr = Atr::new(period);
    debug!(
        bars = bars.len(),
        sma = sma.name(),
        upper = upper.name(),
        lower = lower.name(),
        rsi = rsi.name(),
        atr = atr.name(),
        "computing indicators"
    );

    Ok(IndicatorSet {
        sma: sma.compute(bars),
        std: std_dev.compute(bars),
        upper_band: upper.compute(bars),
        lower_band: lower.compute(bars),
        rsi: rsi.compute(bars),
        atr: atr.compute(bars),
    })
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high = max(open,close) + 1.0,
/// low = min(open,close) - 1.0, one bar per day.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            PriceBar {
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
