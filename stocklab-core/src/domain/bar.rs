//! Bar and PriceSeries: the engine's market data input.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::InputDataError;

/// One OHLCV bar with the feature pipeline's precomputed signal columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub buy_signal: bool,
    pub sell_signal: bool,
}

impl Bar {
    /// A bar with no signals set, O = H = L = C = `close`.
    pub fn flat(timestamp: NaiveDate, close: f64) -> Self {
        Self {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
            buy_signal: false,
            sell_signal: false,
        }
    }

    pub fn with_signals(mut self, buy: bool, sell: bool) -> Self {
        self.buy_signal = buy;
        self.sell_signal = sell;
        self
    }

    /// Check one bar in isolation. `index` is only used for error reporting.
    ///
    /// Every price must be finite and strictly positive.
    fn validate(&self, index: usize) -> Result<(), InputDataError> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (field, value) in prices {
            if !value.is_finite() {
                return Err(InputDataError::NonFinite { index, field });
            }
        }
        for (field, value) in prices {
            if value <= 0.0 {
                return Err(InputDataError::NonPositivePrice {
                    index,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Validated, strictly time-ordered sequence of bars.
///
/// Construction is the only place input is checked; once a `PriceSeries`
/// exists the engine can walk it without re-validating anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Validate and wrap a bar vector.
    ///
    /// Rejects an empty series, non-finite prices, a non-positive close, and
    /// duplicate or decreasing timestamps.
    pub fn new(bars: Vec<Bar>) -> Result<Self, InputDataError> {
        if bars.is_empty() {
            return Err(InputDataError::Empty);
        }
        for (index, bar) in bars.iter().enumerate() {
            bar.validate(index)?;
            if index > 0 {
                let previous = bars[index - 1].timestamp;
                if bar.timestamp <= previous {
                    return Err(InputDataError::NonMonotonicTimestamp {
                        index,
                        previous,
                        current: bar.timestamp,
                    });
                }
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a constructed series; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> &Bar {
        &self.bars[0]
    }

    pub fn last(&self) -> &Bar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn start(&self) -> NaiveDate {
        self.first().timestamp
    }

    pub fn end(&self) -> NaiveDate {
        self.last().timestamp
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Sub-series `[start, end)`. Fails if the range is empty.
    pub fn slice(&self, start: usize, end: usize) -> Result<Self, InputDataError> {
        let end = end.min(self.bars.len());
        if start >= end {
            return Err(InputDataError::Empty);
        }
        Ok(Self {
            bars: self.bars[start..end].to_vec(),
        })
    }

    /// Index of the first bar at or after `date`, or `len()` if none.
    pub fn position_of(&self, date: NaiveDate) -> usize {
        self.bars.partition_point(|b| b.timestamp < date)
    }

    pub fn buy_signal_count(&self) -> usize {
        self.bars.iter().filter(|b| b.buy_signal).count()
    }

    pub fn sell_signal_count(&self) -> usize {
        self.bars.iter().filter(|b| b.sell_signal).count()
    }
}

impl<'de> Deserialize<'de> for PriceSeries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            bars: Vec<Bar>,
        }
        let raw = Raw::deserialize(deserializer)?;
        PriceSeries::new(raw.bars).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, n).unwrap()
    }

    fn bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::flat(day(i as u32 + 1), c))
            .collect()
    }

    #[test]
    fn accepts_valid_series() {
        let series = PriceSeries::new(bars(&[100.0, 101.0, 99.0])).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.start(), day(1));
        assert_eq!(series.end(), day(3));
    }

    #[test]
    fn rejects_empty_series() {
        assert_eq!(PriceSeries::new(vec![]), Err(InputDataError::Empty));
    }

    #[test]
    fn rejects_nan_close() {
        let mut b = bars(&[100.0, 101.0]);
        b[1].close = f64::NAN;
        assert!(matches!(
            PriceSeries::new(b),
            Err(InputDataError::NonFinite {
                index: 1,
                field: "close"
            })
        ));
    }

    #[test]
    fn rejects_non_positive_close() {
        let b = bars(&[100.0, 0.0]);
        assert!(matches!(
            PriceSeries::new(b),
            Err(InputDataError::NonPositivePrice { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_negative_open_with_positive_close() {
        let mut b = bars(&[100.0, 101.0]);
        b[1].open = -5.0;
        assert_eq!(
            PriceSeries::new(b),
            Err(InputDataError::NonPositivePrice {
                index: 1,
                field: "open",
                value: -5.0
            })
        );
    }

    #[test]
    fn rejects_zero_low() {
        let mut b = bars(&[100.0, 101.0]);
        b[0].low = 0.0;
        assert!(matches!(
            PriceSeries::new(b),
            Err(InputDataError::NonPositivePrice {
                index: 0,
                field: "low",
                ..
            })
        ));
    }

    #[test]
    fn rejects_duplicate_timestamp() {
        let mut b = bars(&[100.0, 101.0]);
        b[1].timestamp = b[0].timestamp;
        assert!(matches!(
            PriceSeries::new(b),
            Err(InputDataError::NonMonotonicTimestamp { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_decreasing_timestamp() {
        let mut b = bars(&[100.0, 101.0, 102.0]);
        b[2].timestamp = day(1);
        assert!(matches!(
            PriceSeries::new(b),
            Err(InputDataError::NonMonotonicTimestamp { index: 2, .. })
        ));
    }

    #[test]
    fn slice_and_position_of() {
        let series = PriceSeries::new(bars(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        let tail = series.slice(2, 10).unwrap();
        assert_eq!(tail.closes(), vec![3.0, 4.0]);
        assert_eq!(series.position_of(day(3)), 2);
        assert_eq!(series.position_of(day(30)), 4);
        assert!(series.slice(4, 4).is_err());
    }

    #[test]
    fn deserialization_revalidates() {
        let json = r#"{"bars":[]}"#;
        assert!(serde_json::from_str::<PriceSeries>(json).is_err());
    }
}
