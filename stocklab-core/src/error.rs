//! Error taxonomy for the engine.
//!
//! Configuration and input errors are fatal and raised before the bar loop
//! starts. Ledger errors are what the position ledger reports back to its
//! caller; the engine pre-checks every order so they never surface from a run
//! over validated input.

use chrono::NaiveDate;
use thiserror::Error;

/// Invalid engine or cost-model parameters. Raised at construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} cannot be negative (got {value})")]
    NegativeCost { name: &'static str, value: f64 },
    #[error("{name} must be finite")]
    NonFiniteParameter { name: &'static str },
    #[error("initial_capital must be positive (got {0})")]
    NonPositiveCapital(f64),
    #[error("position_size_pct must be in (0, 1] (got {0})")]
    PositionSizeOutOfRange(f64),
}

/// Malformed price series. Raised before the bar loop starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputDataError {
    #[error("price series is empty")]
    Empty,
    #[error("missing required column '{0}'")]
    MissingColumn(String),
    #[error("row {row}: missing or NaN value in column '{column}'")]
    MissingValue { row: usize, column: String },
    #[error("row {row}: cannot parse '{value}' in column '{column}'")]
    Unparseable {
        row: usize,
        column: String,
        value: String,
    },
    #[error("bar {index}: {field} is not finite")]
    NonFinite { index: usize, field: &'static str },
    #[error("bar {index}: {field} must be positive (got {value})")]
    NonPositivePrice {
        index: usize,
        field: &'static str,
        value: f64,
    },
    #[error("bar {index}: timestamp {current} does not follow {previous}")]
    NonMonotonicTimestamp {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },
}

/// Rejected ledger mutation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("insufficient cash: required {required:.2}, available {available:.2}")]
    InsufficientCash { required: f64, available: f64 },
    #[error("cannot close {requested} shares with only {open} open")]
    InvalidState { requested: f64, open: f64 },
    #[error("share quantity must be positive and finite (got {0})")]
    InvalidQuantity(f64),
}

/// Anything that aborts a backtest run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("input data error: {0}")]
    Input(#[from] InputDataError),
    #[error("ledger error at bar {bar_index}: {source}")]
    Ledger {
        bar_index: usize,
        #[source]
        source: LedgerError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_messages_name_the_parameter() {
        let err = ConfigError::NegativeCost {
            name: "slippage_pct",
            value: -0.1,
        };
        assert_eq!(err.to_string(), "slippage_pct cannot be negative (got -0.1)");
    }

    #[test]
    fn engine_error_wraps_input_error() {
        let err: EngineError = InputDataError::Empty.into();
        assert!(matches!(err, EngineError::Input(InputDataError::Empty)));
        assert_eq!(err.to_string(), "input data error: price series is empty");
    }
}
