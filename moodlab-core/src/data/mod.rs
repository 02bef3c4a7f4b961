//! Data pipeline: series validation and as-of alignment of signals onto price bars.
//!
//! File formats live in the runner; everything here operates on in-memory series.

pub mod align;
pub mod validate;

pub use align::{align_signals, AlignedSeries};
pub use validate::validate_price_series;
