//! Strategy parameters: one point of the sweep grid.

use serde::{Deserialize, Serialize};

use crate::error::{BacktestError, Result};
use crate::indicators::DEFAULT_PERIOD;

/// Everything a single simulation run is parameterised by.
///
/// Percentages are fractions (`0.05` = 5%). Every field has a default so a
/// partial TOML `[strategy]` table deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub initial_capital: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    /// Enables the ATR stop when set.
    pub atr_multiplier: Option<f64>,
    pub ma_window: usize,
    pub indicator_period: usize,
    pub rsi_overbought: f64,
    /// Entry also requires RSI at or above this level. 0 disables it.
    pub rsi_floor: f64,
    pub min_confidence: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            initial_capital: 1000.0,
            stop_loss_pct: 0.05,
            take_profit_pct: 0.10,
            atr_multiplier: None,
            ma_window: 20,
            indicator_period: DEFAULT_PERIOD,
            rsi_overbought: 70.0,
            rsi_floor: 0.0,
            min_confidence: 0.6,
        }
    }
}

impl StrategyParams {
    /// Bars skipped before the first trade decision.
    pub fn warmup_bars(&self) -> usize {
        self.ma_window.saturating_sub(1)
    }

    /// Reject parameter sets that cannot drive a run.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(BacktestError::InvalidParameters(msg));

        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return fail(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            ));
        }
        if !(self.stop_loss_pct.is_finite() && (0.0..1.0).contains(&self.stop_loss_pct)) {
            return fail(format!(
                "stop_loss_pct must be in [0, 1), got {}",
                self.stop_loss_pct
            ));
        }
        if !(self.take_profit_pct.is_finite() && self.take_profit_pct >= 0.0) {
            return fail(format!(
                "take_profit_pct must be non-negative, got {}",
                self.take_profit_pct
            ));
        }
        if let Some(m) = self.atr_multiplier {
            if !(m.is_finite() && m > 0.0) {
                return fail(format!("atr_multiplier must be positive, got {m}"));
            }
        }
        if self.ma_window < 2 {
            return fail(format!("ma_window must be >= 2, got {}", self.ma_window));
        }
        if self.indicator_period < 1 {
            return fail("indicator_period must be >= 1".to_string());
        }
        if !(0.0..=100.0).contains(&self.rsi_overbought) {
            return fail(format!(
                "rsi_overbought must be in [0, 100], got {}",
                self.rsi_overbought
            ));
        }
        if !(0.0..=100.0).contains(&self.rsi_floor) {
            return fail(format!("rsi_floor must be in [0, 100], got {}", self.rsi_floor));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return fail(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            ));
        }
        Ok(())
    }

    /// Short human-readable label, used in logs and sweep tables.
    pub fn label(&self) -> String {
        let atr = match self.atr_multiplier {
            Some(m) => format!("{m}"),
            None => "off".to_string(),
        };
        format!(
            "sl={} tp={} atr={} w={} ob={} floor={} conf={}",
            self.stop_loss_pct,
            self.take_profit_pct,
            atr,
            self.ma_window,
            self.rsi_overbought,
            self.rsi_floor,
            self.min_confidence
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = StrategyParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.warmup_bars(), 19);
    }

    #[test]
    fn partial_table_fills_defaults() {
        let params: StrategyParams = serde_json::from_str(r#"{"ma_window": 5}"#).unwrap();
        assert_eq!(params.ma_window, 5);
        assert_eq!(params.stop_loss_pct, 0.05);
        assert!(params.atr_multiplier.is_none());
    }

    #[test]
    fn window_below_two_is_invalid() {
        let params = StrategyParams {
            ma_window: 1,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(BacktestError::InvalidParameters(_))
        ));
    }

    #[test]
    fn confidence_above_one_is_invalid() {
        let params = StrategyParams {
            min_confidence: 1.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn zero_atr_multiplier_is_invalid() {
        let params = StrategyParams {
            atr_multiplier: Some(0.0),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn non_positive_capital_is_invalid() {
        let params = StrategyParams {
            initial_capital: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn label_shows_atr_mode() {
        let mut params = StrategyParams::default();
        assert!(params.label().contains("atr=off"));
        params.atr_multiplier = Some(2.5);
        assert!(params.label().contains("atr=2.5"));
    }
}
