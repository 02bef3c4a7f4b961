//! Trading signals produced upstream from sentiment trends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Timestamp;

/// Confidence assumed for a signal that carries none.
pub const DEFAULT_CONFIDENCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsing is case-sensitive: only `BUY`, `SELL` and `HOLD` are accepted.
impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Signal::Buy),
            "SELL" => Ok(Signal::Sell),
            "HOLD" => Ok(Signal::Hold),
            other => Err(format!("unknown signal '{other}' (expected BUY, SELL or HOLD)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub timestamp: Timestamp,
    pub signal: Signal,
    pub confidence: Option<f64>,
}

impl SignalRecord {
    pub fn new(timestamp: Timestamp, signal: Signal) -> Self {
        Self {
            timestamp,
            signal,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Confidence with the missing case resolved to full confidence.
    pub fn effective_confidence(&self) -> f64 {
        self.confidence.unwrap_or(DEFAULT_CONFIDENCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn parse_is_case_sensitive() {
        assert_eq!("BUY".parse::<Signal>(), Ok(Signal::Buy));
        assert_eq!("SELL".parse::<Signal>(), Ok(Signal::Sell));
        assert_eq!("HOLD".parse::<Signal>(), Ok(Signal::Hold));
        assert!("buy".parse::<Signal>().is_err());
        assert!("Sell".parse::<Signal>().is_err());
    }

    #[test]
    fn missing_confidence_defaults_to_full() {
        let rec = SignalRecord::new(ts(), Signal::Buy);
        assert_eq!(rec.effective_confidence(), 1.0);
        let rec = rec.with_confidence(0.4);
        assert_eq!(rec.effective_confidence(), 0.4);
    }

    #[test]
    fn serializes_as_screaming_case() {
        let json = serde_json::to_string(&Signal::Sell).unwrap();
        assert_eq!(json, "\"SELL\"");
    }
}
