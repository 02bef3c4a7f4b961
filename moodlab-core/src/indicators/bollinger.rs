//! Bollinger Bands: moving average plus or minus a multiple of the standard deviation.
//!
//! Three series (separate Indicator instances); the middle line is `Sma`:
//! - StdDev: sample stddev(close, period), divide by N-1
//! - Upper: SMA + mult * stddev
//! - Lower: SMA - mult * stddev
//!
//! Lookback: period - 1. Period must be >= 2 for the sample stddev to exist.

use super::Indicator;
use crate::domain::PriceBar;

/// Which series of the Bollinger family to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Lower,
    StdDev,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    fn build(period: usize, multiplier: f64, band: BollingerBand, label: &str) -> Self {
        assert!(period >= 2, "Bollinger period must be >= 2");
        Self {
            period,
            multiplier,
            band,
            name: format!("bollinger_{label}_{period}_{multiplier}"),
        }
    }

    pub fn upper(period: usize, multiplier: f64) -> Self {
        Self::build(period, multiplier, BollingerBand::Upper, "upper")
    }

    pub fn lower(period: usize, multiplier: f64) -> Self {
        Self::build(period, multiplier, BollingerBand::Lower, "lower")
    }

    pub fn std_dev(period: usize) -> Self {
        Self::build(period, 1.0, BollingerBand::StdDev, "std")
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<Option<f64>> {
        let n = bars.len();
        let mut result = vec![None; n];

        if n < self.period {
            return result;
        }

        for i in (self.period - 1)..n {
            let window = &bars[i + 1 - self.period..=i];
            let mean = window.iter().map(|b| b.close).sum::<f64>() / self.period as f64;

            let variance = window
                .iter()
                .map(|b| {
                    let diff = b.close - mean;
                    diff * diff
                })
                .sum::<f64>()
                / (self.period - 1) as f64;
            let stddev = variance.sqrt();

            result[i] = Some(match self.band {
                BollingerBand::Upper => mean + self.multiplier * stddev,
                BollingerBand::Lower => mean - self.multiplier * stddev,
                BollingerBand::StdDev => stddev,
            });
        }

        result
    }
}
