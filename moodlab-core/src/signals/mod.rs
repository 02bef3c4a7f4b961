//! Sentiment-trend signal generation.
//!
//! Labelled sentiment records are turned into BUY/SELL/HOLD signals from the
//! rolling share of bullish and bearish labels over the last `window` records
//! (fewer at the start of the series). Records are processed in input order.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use crate::domain::{Signal, SignalRecord, Timestamp};
use crate::error::{BacktestError, Result};

pub const DEFAULT_TREND_WINDOW: usize = 10;
pub const DEFAULT_TREND_THRESHOLD: f64 = 0.6;

/// Sentiment class of one post. Anything not bullish or bearish is neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Bullish,
    Bearish,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Bullish => "bullish",
            SentimentLabel::Bearish => "bearish",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "bullish" => SentimentLabel::Bullish,
            "bearish" => SentimentLabel::Bearish,
            _ => SentimentLabel::Neutral,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub timestamp: Timestamp,
    pub label: SentimentLabel,
}

/// One generated signal with the trends that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSignal {
    pub timestamp: Timestamp,
    pub label: SentimentLabel,
    pub bullish_trend: f64,
    pub bearish_trend: f64,
    pub signal: Signal,
    pub confidence: f64,
}

impl TrendSignal {
    pub fn to_record(&self) -> SignalRecord {
        SignalRecord::new(self.timestamp, self.signal).with_confidence(self.confidence)
    }
}

#[derive(Debug, Clone)]
pub struct SignalGenerator {
    window: usize,
    threshold: f64,
}

impl Default for SignalGenerator {
    fn default() -> Self {
        Self {
            window: DEFAULT_TREND_WINDOW,
            threshold: DEFAULT_TREND_THRESHOLD,
        }
    }
}

impl SignalGenerator {
    pub fn new(window: usize, threshold: f64) -> Result<Self> {
        if window == 0 {
            return Err(BacktestError::InvalidParameters(
                "trend window must be >= 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(BacktestError::InvalidParameters(format!(
                "trend threshold must be in [0, 1], got {threshold}"
            )));
        }
        Ok(Self { window, threshold })
    }

    /// BUY when the bullish share beats the threshold, else SELL when the bearish
    /// share does, else HOLD.
    ///
    /// Confidence is the share that triggered the signal; for HOLD it is one minus
    /// the larger share.
    pub fn classify(&self, bullish_trend: f64, bearish_trend: f64) -> (Signal, f64) {
        if bullish_trend > self.threshold {
            (Signal::Buy, bullish_trend)
        } else if bearish_trend > self.threshold {
            (Signal::Sell, bearish_trend)
        } else {
            (Signal::Hold, 1.0 - bullish_trend.max(bearish_trend))
        }
    }

    pub fn generate(&self, records: &[SentimentRecord]) -> Vec<TrendSignal> {
        let mut recent: VecDeque<SentimentLabel> = VecDeque::with_capacity(self.window);
        let mut bullish = 0usize;
        let mut bearish = 0usize;

        records
            .iter()
            .map(|rec| {
                if recent.len() == self.window {
                    match recent.pop_front() {
                        Some(SentimentLabel::Bullish) => bullish -= 1,
                        Some(SentimentLabel::Bearish) => bearish -= 1,
                        _ => {}
                    }
                }
                recent.push_back(rec.label);
                match rec.label {
                    SentimentLabel::Bullish => bullish += 1,
                    SentimentLabel::Bearish => bearish += 1,
                    SentimentLabel::Neutral => {}
                }

                let n = recent.len() as f64;
                let bullish_trend = bullish as f64 / n;
                let bearish_trend = bearish as f64 / n;
                let (signal, confidence) = self.classify(bullish_trend, bearish_trend);
                TrendSignal {
                    timestamp: rec.timestamp,
                    label: rec.label,
                    bullish_trend,
                    bearish_trend,
                    signal,
                    confidence,
                }
            })
            .collect()
    }
}
