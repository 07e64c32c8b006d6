//! CSV input adapter for the feature pipeline's output.
//!
//! Expected columns (header names are case-insensitive, order is free):
//! `Date, Open, High, Low, Close, Volume, buy_signal, sell_signal`.
//! Extra columns are ignored. Empty cells and `nan` are rejected, never
//! filled in; the engine only ever sees a fully validated `PriceSeries`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use thiserror::Error;

use stocklab_core::domain::{Bar, PriceSeries};
use stocklab_core::error::InputDataError;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid price data: {0}")]
    Input(#[from] InputDataError),
}

const DATE_COLUMNS: [&str; 3] = ["date", "timestamp", "datetime"];
const REQUIRED: [&str; 7] = [
    "open",
    "high",
    "low",
    "close",
    "volume",
    "buy_signal",
    "sell_signal",
];

/// Column positions resolved from the header row.
struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    buy: usize,
    sell: usize,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, InputDataError> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_ascii_lowercase()).collect();
        let find = |name: &str| names.iter().position(|h| h == name);

        let date = DATE_COLUMNS
            .iter()
            .find_map(|name| find(name))
            .ok_or_else(|| InputDataError::MissingColumn("Date".into()))?;

        let mut idx = [0usize; REQUIRED.len()];
        for (slot, name) in idx.iter_mut().zip(REQUIRED) {
            *slot = find(name).ok_or_else(|| InputDataError::MissingColumn(name.into()))?;
        }
        let [open, high, low, close, volume, buy, sell] = idx;
        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            volume,
            buy,
            sell,
        })
    }
}

/// Load and validate a CSV file.
pub fn load_csv(path: &Path) -> Result<PriceSeries, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let series = read_series(file)?;
    tracing::info!(
        path = %path.display(),
        bars = series.len(),
        start = %series.start(),
        end = %series.end(),
        buy_signals = series.buy_signal_count(),
        sell_signals = series.sell_signal_count(),
        "loaded price series"
    );
    Ok(series)
}

/// Parse CSV from any reader.
pub fn read_series<R: Read>(reader: R) -> Result<PriceSeries, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let cols = Columns::resolve(rdr.headers()?)?;
    let names: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let mut bars = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let cell = |i: usize| -> Result<&str, InputDataError> {
            let value = record.get(i).unwrap_or("");
            if value.is_empty() || value.eq_ignore_ascii_case("nan") {
                return Err(InputDataError::MissingValue {
                    row,
                    column: names[i].clone(),
                });
            }
            Ok(value)
        };
        let unparseable = |i: usize, value: &str| InputDataError::Unparseable {
            row,
            column: names[i].clone(),
            value: value.to_string(),
        };
        let float = |i: usize| -> Result<f64, InputDataError> {
            let value = cell(i)?;
            value.parse::<f64>().map_err(|_| unparseable(i, value))
        };
        let flag = |i: usize| -> Result<bool, InputDataError> {
            let value = cell(i)?;
            parse_flag(value).ok_or_else(|| unparseable(i, value))
        };

        let date_text = cell(cols.date)?;
        let timestamp = parse_date(date_text).ok_or_else(|| unparseable(cols.date, date_text))?;
        let volume_text = cell(cols.volume)?;
        let volume = parse_volume(volume_text).ok_or_else(|| unparseable(cols.volume, volume_text))?;

        bars.push(Bar {
            timestamp,
            open: float(cols.open)?,
            high: float(cols.high)?,
            low: float(cols.low)?,
            close: float(cols.close)?,
            volume,
            buy_signal: flag(cols.buy)?,
            sell_signal: flag(cols.sell)?,
        });
    }

    Ok(PriceSeries::new(bars)?)
}

/// `YYYY-MM-DD`, optionally followed by a time part that is dropped.
fn parse_date(text: &str) -> Option<NaiveDate> {
    let day = text.split([' ', 'T']).next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Integer volume; float-formatted whole numbers (`1200.0`) are accepted.
fn parse_volume(text: &str) -> Option<u64> {
    if let Ok(v) = text.parse::<u64>() {
        return Some(v);
    }
    let v = text.parse::<f64>().ok()?;
    (v.is_finite() && v >= 0.0 && v.fract() == 0.0).then_some(v as u64)
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" | "1.0" | "yes" => Some(true),
        "false" | "0" | "0.0" | "no" => Some(false),
        _ => None,
    }
}
