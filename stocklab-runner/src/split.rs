//! In-sample / out-of-sample split.
//!
//! Splits one price series into two consecutive periods and runs each as an
//! independent backtest with its own ledger. Positions never carry across
//! the boundary.

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stocklab_core::domain::PriceSeries;
use stocklab_core::logging::{RunLogger, TracingLogger};

use crate::config::BacktestConfig;
use crate::runner::{run_with_logger, BacktestResult, RunError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplitError {
    #[error("split fraction must be in (0, 1) (got {0})")]
    FractionOutOfRange(f64),
    #[error("split date {date} leaves the {period} period empty ({start}..={end})")]
    EmptyPeriod {
        date: NaiveDate,
        period: &'static str,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("series of {0} bars is too short to split")]
    TooShort(usize),
    #[error("cannot parse split point '{0}' (expected a fraction like 0.7 or a date like 2023-01-01)")]
    Unparseable(String),
}

/// Where the out-of-sample period starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPoint {
    /// Fraction of bars that go in-sample.
    Fraction(f64),
    /// First out-of-sample date (inclusive).
    Date(NaiveDate),
}

impl FromStr for SplitPoint {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::Date(date));
        }
        s.parse::<f64>()
            .map(Self::Fraction)
            .map_err(|_| SplitError::Unparseable(s.to_string()))
    }
}

/// Split `series` into (in-sample, out-of-sample).
pub fn split_series(
    series: &PriceSeries,
    point: SplitPoint,
) -> Result<(PriceSeries, PriceSeries), SplitError> {
    let len = series.len();
    if len < 2 {
        return Err(SplitError::TooShort(len));
    }

    let boundary = match point {
        SplitPoint::Fraction(f) => {
            if !(f > 0.0 && f < 1.0) {
                return Err(SplitError::FractionOutOfRange(f));
            }
            ((len as f64 * f).floor() as usize).clamp(1, len - 1)
        }
        SplitPoint::Date(date) => {
            let idx = series.position_of(date);
            if idx == 0 || idx == len {
                return Err(SplitError::EmptyPeriod {
                    date,
                    period: if idx == 0 { "in-sample" } else { "out-of-sample" },
                    start: series.start(),
                    end: series.end(),
                });
            }
            idx
        }
    };

    // Both halves are non-empty by construction.
    let in_sample = series
        .slice(0, boundary)
        .map_err(|_| SplitError::TooShort(len))?;
    let out_of_sample = series
        .slice(boundary, len)
        .map_err(|_| SplitError::TooShort(len))?;
    Ok((in_sample, out_of_sample))
}

/// Results for both periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodReport {
    pub split: SplitPoint,
    pub oos_start: NaiveDate,
    pub in_sample: BacktestResult,
    pub out_of_sample: BacktestResult,
}

impl PeriodReport {
    /// OOS Sharpe / IS Sharpe. None when the in-sample Sharpe is not positive.
    pub fn sharpe_degradation(&self) -> Option<f64> {
        let is_sharpe = self.in_sample.metrics.sharpe;
        (is_sharpe > 0.0).then(|| self.out_of_sample.metrics.sharpe / is_sharpe)
    }
}

/// Split, then backtest each period independently.
pub fn run_split(
    series: &PriceSeries,
    config: &BacktestConfig,
    point: SplitPoint,
) -> Result<PeriodReport, RunError> {
    let label = config.label().to_string();
    run_split_with(series, config, point, |period| {
        Arc::new(TracingLogger::new(format!("{label}/{period}")))
    })
}

/// As `run_split`, with a logger factory keyed by period name.
pub fn run_split_with(
    series: &PriceSeries,
    config: &BacktestConfig,
    point: SplitPoint,
    logger_for: impl Fn(&str) -> Arc<dyn RunLogger>,
) -> Result<PeriodReport, RunError> {
    let (is_series, oos_series) = split_series(series, point)?;
    let in_sample = run_with_logger(&is_series, config, logger_for("in_sample"))?;
    let out_of_sample = run_with_logger(&oos_series, config, logger_for("out_of_sample"))?;
    Ok(PeriodReport {
        split: point,
        oos_start: oos_series.start(),
        in_sample,
        out_of_sample,
    })
}
