//! Seeded synthetic market data for dry runs and benchmarks.
//!
//! The RNG seed is derived from a label with BLAKE3, so the same label always
//! yields the same series on every platform.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use moodlab_core::{PriceBar, Signal, SignalRecord, Timestamp};

const START_PRICE: f64 = 100.0;
const MAX_DAILY_MOVE: f64 = 0.03;
const SIGNAL_PROBABILITY: f64 = 0.2;

/// Derive a stable 64-bit seed from a label.
pub fn seed_for(label: &str) -> u64 {
    let hash = blake3::hash(label.as_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(seed)
}

fn start_timestamp() -> Timestamp {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(16, 0, 0))
        .unwrap_or_default()
}

/// `n` daily bars of a bounded random walk starting at 100.
pub fn synthetic_prices(n: usize, label: &str) -> Vec<PriceBar> {
    let mut rng = StdRng::seed_from_u64(seed_for(label));
    let start = start_timestamp();
    let mut close = START_PRICE;
    let mut bars = Vec::with_capacity(n);

    for i in 0..n {
        let open = close;
        close = (open * (1.0 + rng.gen_range(-MAX_DAILY_MOVE..MAX_DAILY_MOVE))).max(1.0);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        bars.push(PriceBar {
            timestamp: start + Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: rng.gen_range(50_000.0..150_000.0_f64).round(),
        });
    }
    bars
}

/// Random signals posted a few hours after roughly one bar in five.
pub fn synthetic_signals(prices: &[PriceBar], label: &str) -> Vec<SignalRecord> {
    let mut rng = StdRng::seed_from_u64(seed_for(&format!("{label}/signals")));
    prices
        .iter()
        .filter_map(|bar| {
            if !rng.gen_bool(SIGNAL_PROBABILITY) {
                return None;
            }
            let signal = match rng.gen_range(0..3) {
                0 => Signal::Buy,
                1 => Signal::Sell,
                _ => Signal::Hold,
            };
            let posted = bar.timestamp + Duration::hours(rng.gen_range(1..8));
            Some(SignalRecord::new(posted, signal).with_confidence(rng.gen_range(0.4..=1.0)))
        })
        .collect()
}
