//! Price bars and the aligned, indicator-annotated bars the simulator consumes.

use serde::{Deserialize, Serialize};

use super::signal::Signal;
use super::Timestamp;

/// One OHLCV observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: Timestamp,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Returns a reason when a numeric field cannot be used, `None` if the bar is usable.
    ///
    /// Open and close must be positive; high, low and volume must be finite and
    /// non-negative.
    pub fn defect(&self) -> Option<&'static str> {
        if !(self.open.is_finite() && self.open > 0.0) {
            return Some("open must be a positive finite number");
        }
        if !(self.close.is_finite() && self.close > 0.0) {
            return Some("close must be a positive finite number");
        }
        if !(self.high.is_finite() && self.high >= 0.0) {
            return Some("high must be a non-negative finite number");
        }
        if !(self.low.is_finite() && self.low >= 0.0) {
            return Some("low must be a non-negative finite number");
        }
        if !(self.volume.is_finite() && self.volume >= 0.0) {
            return Some("volume must be a non-negative finite number");
        }
        None
    }
}

/// A price bar joined with its as-of signal and the derived indicator fields.
///
/// Indicator fields are `None` until enough history exists; they are never zero-filled.
/// `atr` is the exception: it is defined from the first bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedBar {
    pub bar: PriceBar,
    pub signal: Option<Signal>,
    pub confidence: Option<f64>,
    pub sma: Option<f64>,
    pub std: Option<f64>,
    pub upper_band: Option<f64>,
    pub lower_band: Option<f64>,
    pub rsi: Option<f64>,
    pub atr: Option<f64>,
}

impl AlignedBar {
    /// A bar with no signal and no indicator values yet.
    pub fn bare(bar: PriceBar) -> Self {
        Self {
            bar,
            signal: None,
            confidence: None,
            sma: None,
            std: None,
            upper_band: None,
            lower_band: None,
            rsi: None,
            atr: None,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        self.bar.timestamp
    }

    pub fn close(&self) -> f64 {
        self.bar.close
    }
}
