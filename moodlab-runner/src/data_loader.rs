//! CSV loading for price bars, signal records, sentiment records and trade logs.
//!
//! Every reader checks the header first: a missing required column is a
//! `DataFormat` error naming the column. Rows that fail to parse (bad number,
//! unknown signal, unparseable timestamp) are `MalformedSeries` errors carrying
//! the zero-based data row index.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use thiserror::Error;

use moodlab_core::signals::{SentimentLabel, SentimentRecord};
use moodlab_core::{BacktestError, PriceBar, Signal, SignalRecord, Timestamp, Trade, TradeAction};

/// Output format for every timestamp this crate writes.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Accepted alternatives when a sentiment file has no `timestamp` column.
const SENTIMENT_TIMESTAMP_ALIASES: [&str; 4] = ["date", "time", "created_at", "datetime"];

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read CSV from {source_name}: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Data(#[from] BacktestError),
}

impl LoadError {
    /// The core data error, if this is one.
    pub fn as_data_error(&self) -> Option<&BacktestError> {
        match self {
            LoadError::Data(e) => Some(e),
            _ => None,
        }
    }
}

// ─── Timestamps ─────────────────────────────────────────────────────

/// Parse an ISO-8601 style timestamp.
///
/// Accepts RFC 3339 (offsets are converted to UTC), `YYYY-MM-DD HH:MM:SS[.f]`,
/// `YYYY-MM-DDTHH:MM:SS[.f]` and a bare `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn timestamp_at(row: usize, raw: &str) -> Result<Timestamp, LoadError> {
    parse_timestamp(raw).ok_or_else(|| {
        BacktestError::malformed(row, format!("unparseable timestamp '{raw}'")).into()
    })
}

// ─── Raw rows ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PriceRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct SignalRow {
    timestamp: String,
    signal: String,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TradeRow {
    action: String,
    timestamp: String,
    price: f64,
    stop_loss: Option<f64>,
}

// ─── Generic reader ─────────────────────────────────────────────────

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn source_label(path: &Path) -> String {
    path.display().to_string()
}

/// Read every row as `T` after checking that `required` columns exist.
///
/// `rename` maps a header to the name `T` expects (used for timestamp aliases).
fn read_rows<R, T>(
    reader: R,
    source_name: &str,
    required: &[&str],
    rename: Option<(&str, &str)>,
) -> Result<Vec<T>, LoadError>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
{
    let csv_err = |source| LoadError::Csv {
        source_name: source_name.to_string(),
        source,
    };
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut headers = rdr.headers().map_err(csv_err)?.clone();

    if let Some((from, to)) = rename {
        headers = headers
            .iter()
            .map(|h| if h == from { to } else { h })
            .collect();
    }
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(BacktestError::missing_column(source_name, *column).into());
        }
    }

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let row: T = record
            .deserialize(Some(&headers))
            .map_err(|e| BacktestError::malformed(i, e.to_string()))?;
        rows.push(row);
    }
    Ok(rows)
}

// ─── Prices ─────────────────────────────────────────────────────────

pub fn read_prices<R: Read>(reader: R, source_name: &str) -> Result<Vec<PriceBar>, LoadError> {
    let rows: Vec<PriceRow> = read_rows(
        reader,
        source_name,
        &["timestamp", "open", "high", "low", "close", "volume"],
        None,
    )?;
    rows.into_iter()
        .enumerate()
        .map(|(i, r)| -> Result<PriceBar, LoadError> {
            Ok(PriceBar {
                timestamp: timestamp_at(i, &r.timestamp)?,
                open: r.open,
                high: r.high,
                low: r.low,
                close: r.close,
                volume: r.volume,
            })
        })
        .collect()
}

pub fn load_prices(path: &Path) -> Result<Vec<PriceBar>, LoadError> {
    read_prices(open(path)?, &source_label(path))
}

// ─── Signals ────────────────────────────────────────────────────────

pub fn read_signals<R: Read>(reader: R, source_name: &str) -> Result<Vec<SignalRecord>, LoadError> {
    let rows: Vec<SignalRow> = read_rows(reader, source_name, &["timestamp", "signal"], None)?;
    rows.into_iter()
        .enumerate()
        .map(|(i, r)| -> Result<SignalRecord, LoadError> {
            let signal: Signal = r
                .signal
                .parse()
                .map_err(|e: String| BacktestError::malformed(i, e))?;
            if let Some(c) = r.confidence {
                if !(0.0..=1.0).contains(&c) {
                    return Err(BacktestError::malformed(
                        i,
                        format!("confidence {c} outside [0, 1]"),
                    )
                    .into());
                }
            }
            Ok(SignalRecord {
                timestamp: timestamp_at(i, &r.timestamp)?,
                signal,
                confidence: r.confidence,
            })
        })
        .collect()
}

pub fn load_signals(path: &Path) -> Result<Vec<SignalRecord>, LoadError> {
    read_signals(open(path)?, &source_label(path))
}

// ─── Sentiment ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SentimentRow {
    timestamp: String,
    sentiment_label: String,
}

/// Read labelled sentiment records. The timestamp column may be named
/// `timestamp`, `date`, `time`, `created_at` or `datetime`.
pub fn read_sentiment<R: Read>(
    reader: R,
    source_name: &str,
) -> Result<Vec<SentimentRecord>, LoadError> {
    let csv_err = |source: csv::Error| LoadError::Csv {
        source_name: source_name.to_string(),
        source,
    };
    let mut buf = Vec::new();
    let mut reader = reader;
    reader
        .read_to_end(&mut buf)
        .map_err(|e| csv_err(e.into()))?;

    let headers = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(buf.as_slice())
        .headers()
        .map_err(csv_err)?
        .clone();
    let alias = if headers.iter().any(|h| h == "timestamp") {
        None
    } else {
        SENTIMENT_TIMESTAMP_ALIASES
            .iter()
            .find(|a| headers.iter().any(|h| h == **a))
            .map(|a| (*a, "timestamp"))
    };

    let rows: Vec<SentimentRow> = read_rows(
        buf.as_slice(),
        source_name,
        &["timestamp", "sentiment_label"],
        alias,
    )?;
    rows.into_iter()
        .enumerate()
        .map(|(i, r)| -> Result<SentimentRecord, LoadError> {
            Ok(SentimentRecord {
                timestamp: timestamp_at(i, &r.timestamp)?,
                label: r
                    .sentiment_label
                    .parse()
                    .unwrap_or(SentimentLabel::Neutral),
            })
        })
        .collect()
}

pub fn load_sentiment(path: &Path) -> Result<Vec<SentimentRecord>, LoadError> {
    read_sentiment(open(path)?, &source_label(path))
}

// ─── Trade logs ─────────────────────────────────────────────────────

pub fn read_trades<R: Read>(reader: R, source_name: &str) -> Result<Vec<Trade>, LoadError> {
    let rows: Vec<TradeRow> =
        read_rows(reader, source_name, &["action", "timestamp", "price"], None)?;
    rows.into_iter()
        .enumerate()
        .map(|(i, r)| -> Result<Trade, LoadError> {
            let action: TradeAction = r
                .action
                .parse()
                .map_err(|e: String| BacktestError::malformed(i, e))?;
            check_price(i, "price", r.price)?;
            if let Some(stop) = r.stop_loss {
                check_price(i, "stop_loss", stop)?;
            }
            Ok(Trade {
                action,
                timestamp: timestamp_at(i, &r.timestamp)?,
                price: r.price,
                stop_loss: r.stop_loss,
            })
        })
        .collect()
}

fn check_price(row: usize, column: &str, value: f64) -> Result<(), LoadError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(BacktestError::malformed(
            row,
            format!("{column} {value} must be finite and positive"),
        )
        .into())
    }
}

pub fn load_trades(path: &Path) -> Result<Vec<Trade>, LoadError> {
    read_trades(open(path)?, &source_label(path))
}

// ─── Fingerprint ────────────────────────────────────────────────────

/// Deterministic BLAKE3 hash over a price series and its signals.
///
/// Signals are hashed in input order; reordering them changes the hash even
/// though alignment would not.
pub fn compute_dataset_hash(prices: &[PriceBar], signals: &[SignalRecord]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"prices");
    for bar in prices {
        hasher.update(format_timestamp(&bar.timestamp).as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.update(b"signals");
    for rec in signals {
        hasher.update(format_timestamp(&rec.timestamp).as_bytes());
        hasher.update(rec.signal.as_str().as_bytes());
        hasher.update(&rec.effective_confidence().to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
