//! Price series validation.
//!
//! A series is usable when every bar has sane numeric fields and timestamps are
//! strictly increasing. The first violation fails the run with its row index.

use crate::domain::PriceBar;
use crate::error::{BacktestError, Result};

pub fn validate_price_series(bars: &[PriceBar]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        if let Some(reason) = bar.defect() {
            return Err(BacktestError::malformed(i, reason));
        }
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(BacktestError::malformed(
                i,
                format!(
                    "timestamp {} is not after previous bar {}",
                    bar.timestamp,
                    bars[i - 1].timestamp
                ),
            ));
        }
    }
    Ok(())
}
