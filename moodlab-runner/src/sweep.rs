//! Parameter sweep over a Cartesian grid of strategy settings.
//!
//! Every combination runs in its own context against the same prepared series.
//! Rows are collected by combination index, so parallel and sequential sweeps
//! produce identical output. A failing combination records its error and the
//! sweep carries on.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use moodlab_core::StrategyParams;

use crate::config::{run_id, RunId};
use crate::metrics::RunResult;
use crate::runner::{run_prepared, PreparedData};

#[derive(Debug, Error, PartialEq)]
pub enum SweepError {
    #[error("price series is empty, nothing to sweep")]
    EmptyDataset,
}

/// Discrete values for each sweepable parameter.
///
/// An empty axis keeps the base parameter value. Axes are expanded in field
/// order with the first axis varying slowest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepAxes {
    pub stop_loss_pct: Vec<f64>,
    pub take_profit_pct: Vec<f64>,
    pub atr_multiplier: Vec<f64>,
    pub ma_window: Vec<usize>,
    pub rsi_overbought: Vec<f64>,
    pub rsi_floor: Vec<f64>,
    pub min_confidence: Vec<f64>,
}

fn values_or<T: Copy>(axis: &[T], base: T) -> Vec<T> {
    if axis.is_empty() {
        vec![base]
    } else {
        axis.to_vec()
    }
}

/// Replace each set in `sets` by one copy per axis value.
fn expand<T: Copy>(
    sets: Vec<StrategyParams>,
    values: &[T],
    apply: impl Fn(&mut StrategyParams, T),
) -> Vec<StrategyParams> {
    sets.into_iter()
        .flat_map(|base| {
            values.iter().map({
                let apply = &apply;
                move |&v| {
                    let mut p = base.clone();
                    apply(&mut p, v);
                    p
                }
            })
        })
        .collect()
}

impl SweepAxes {
    /// ATR, take-profit and RSI grid used for exploratory sweeps.
    pub fn default_grid() -> Self {
        Self {
            take_profit_pct: vec![0.05, 0.10, 0.15],
            atr_multiplier: vec![1.5, 2.0, 2.5, 3.0],
            rsi_overbought: vec![60.0, 70.0],
            rsi_floor: vec![30.0, 40.0],
            ..Default::default()
        }
    }

    /// Number of combinations. Empty axes count as one value.
    pub fn size(&self) -> usize {
        [
            self.stop_loss_pct.len(),
            self.take_profit_pct.len(),
            self.atr_multiplier.len(),
            self.ma_window.len(),
            self.rsi_overbought.len(),
            self.rsi_floor.len(),
            self.min_confidence.len(),
        ]
        .iter()
        .map(|&n| n.max(1))
        .product()
    }

    /// Every parameter set in the grid, in deterministic order.
    pub fn combinations(&self, base: &StrategyParams) -> Vec<StrategyParams> {
        let atr: Vec<Option<f64>> = if self.atr_multiplier.is_empty() {
            vec![base.atr_multiplier]
        } else {
            self.atr_multiplier.iter().copied().map(Some).collect()
        };

        let mut sets = vec![base.clone()];
        sets = expand(sets, &values_or(&self.stop_loss_pct, base.stop_loss_pct), |p, v| {
            p.stop_loss_pct = v
        });
        sets = expand(sets, &values_or(&self.take_profit_pct, base.take_profit_pct), |p, v| {
            p.take_profit_pct = v
        });
        sets = expand(sets, &atr, |p, v| p.atr_multiplier = v);
        sets = expand(sets, &values_or(&self.ma_window, base.ma_window), |p, v| {
            p.ma_window = v
        });
        sets = expand(sets, &values_or(&self.rsi_overbought, base.rsi_overbought), |p, v| {
            p.rsi_overbought = v
        });
        sets = expand(sets, &values_or(&self.rsi_floor, base.rsi_floor), |p, v| {
            p.rsi_floor = v
        });
        expand(sets, &values_or(&self.min_confidence, base.min_confidence), |p, v| {
            p.min_confidence = v
        })
    }
}

/// One row of the sweep table: a parameter set and either its metrics or its error.
#[derive(Debug, Clone, Serialize)]
pub struct SweepRow {
    pub index: usize,
    pub run_id: RunId,
    pub params: StrategyParams,
    pub result: Option<RunResult>,
    pub error: Option<String>,
}

impl SweepRow {
    pub fn is_ok(&self) -> bool {
        self.result.is_some()
    }

    pub fn roi_pct(&self) -> Option<f64> {
        self.result.as_ref().map(|r| r.roi_pct)
    }
}

/// Parameter sweep executor.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every combination of `axes` over `base` against `data`.
    ///
    /// Fails only when the price series is empty; all other failures are
    /// recorded on their row.
    pub fn run(
        &self,
        axes: &SweepAxes,
        base: &StrategyParams,
        data: &PreparedData,
    ) -> Result<SweepResults, SweepError> {
        if data.is_empty() {
            return Err(SweepError::EmptyDataset);
        }
        let combos = axes.combinations(base);

        let rows: Vec<SweepRow> = if self.parallel {
            combos
                .par_iter()
                .enumerate()
                .map(|(index, params)| run_one(index, params, data))
                .collect()
        } else {
            combos
                .iter()
                .enumerate()
                .map(|(index, params)| run_one(index, params, data))
                .collect()
        };

        let failed = rows.iter().filter(|r| !r.is_ok()).count();
        info!(
            combinations = rows.len(),
            failed,
            parallel = self.parallel,
            "sweep complete"
        );
        Ok(SweepResults {
            rows,
            dataset_hash: data.dataset_hash.clone(),
        })
    }
}

fn run_one(index: usize, params: &StrategyParams, data: &PreparedData) -> SweepRow {
    let id = run_id(params);
    match run_prepared(data, params) {
        Ok(result) => SweepRow {
            index,
            run_id: id,
            params: params.clone(),
            result: Some(result.metrics),
            error: None,
        },
        Err(e) => {
            warn!(index, params = %params.label(), error = %e, "sweep combination failed");
            SweepRow {
                index,
                run_id: id,
                params: params.clone(),
                result: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Results from a parameter sweep, in combination order.
#[derive(Debug, Clone, Serialize)]
pub struct SweepResults {
    rows: Vec<SweepRow>,
    pub dataset_hash: String,
}

impl SweepResults {
    pub fn all(&self) -> &[SweepRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, run_id: &str) -> Option<&SweepRow> {
        self.rows.iter().find(|r| r.run_id == run_id)
    }

    /// Rows by ROI, best first; failed rows last in combination order.
    pub fn sorted_by_roi(&self) -> Vec<&SweepRow> {
        let mut sorted: Vec<_> = self.rows.iter().collect();
        sorted.sort_by(|a, b| match (a.roi_pct(), b.roi_pct()) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        sorted
    }

    pub fn top_n(&self, n: usize) -> Vec<&SweepRow> {
        self.sorted_by_roi().into_iter().take(n).collect()
    }

    pub fn best(&self) -> Option<&SweepRow> {
        self.sorted_by_roi().into_iter().find(|r| r.is_ok())
    }
}
