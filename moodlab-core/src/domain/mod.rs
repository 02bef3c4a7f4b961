//! Domain types shared by every stage of a backtest.

pub mod bar;
pub mod signal;
pub mod trade;

pub use bar::{AlignedBar, PriceBar};
pub use signal::{Signal, SignalRecord, DEFAULT_CONFIDENCE};
pub use trade::{Trade, TradeAction};

/// All series are keyed by naive (UTC) timestamps.
pub type Timestamp = chrono::NaiveDateTime;
