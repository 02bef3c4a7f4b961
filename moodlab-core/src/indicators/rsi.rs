//! Relative Strength Index (RSI).
//!
//! Average gain and average loss are simple means of the per-bar close deltas over
//! the last `period` bars (no Wilder smoothing). The first bar has no predecessor
//! and contributes a zero delta.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period - 1.
//! Edge case: avg_loss == 0 → RSI = 100.

use super::Indicator;
use crate::domain::PriceBar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<Option<f64>> {
        let n = bars.len();
        let mut result = vec![None; n];

        if n < self.period {
            return result;
        }

        let deltas: Vec<f64> = (0..n)
            .map(|i| if i == 0 { 0.0 } else { bars[i].close - bars[i - 1].close })
            .collect();

        for i in (self.period - 1)..n {
            let window = &deltas[i + 1 - self.period..=i];
            let gain = window.iter().filter(|d| **d > 0.0).sum::<f64>() / self.period as f64;
            let loss = -window.iter().filter(|d| **d < 0.0).sum::<f64>() / self.period as f64;
            result[i] = Some(rsi_from_averages(gain, loss));
        }

        result
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}
