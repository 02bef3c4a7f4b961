//! Error taxonomy shared by every stage of a backtest run.
//!
//! The three data errors mirror how a run reacts to bad input:
//! - `DataFormat`: a required column is missing or misnamed. Surfaced to the caller.
//! - `InsufficientData`: not enough bars to compute anything.
//! - `MalformedSeries`: out-of-order timestamps or unusable numeric fields. Fails the run.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("data format error in {source_name}: missing required column '{column}'")]
    DataFormat { source_name: String, column: String },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("malformed series at row {row}: {reason}")]
    MalformedSeries { row: usize, reason: String },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

impl BacktestError {
    pub fn malformed(row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedSeries {
            row,
            reason: reason.into(),
        }
    }

    pub fn missing_column(source_name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::DataFormat {
            source_name: source_name.into(),
            column: column.into(),
        }
    }
}

pub type Result<T, E = BacktestError> = std::result::Result<T, E>;
