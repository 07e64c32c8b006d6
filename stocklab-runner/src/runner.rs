//! Backtest runner: wires together config, engine, metrics, and benchmark.
//!
//! Entry points:
//! - `run_single_backtest()`: pre-loaded series, logs through `tracing`. Used by CLI.
//! - `run_with_logger()`: same, with an explicit run logger. Used by sweeps and tests.
//! - `run_from_csv()`: loads the CSV first.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stocklab_core::domain::PriceSeries;
use stocklab_core::engine::{BacktestEngine, RunResult};
use stocklab_core::error::EngineError;
use stocklab_core::logging::{RunLogger, TracingLogger};

use crate::benchmark::{run_buy_and_hold, BenchmarkResult};
use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_csv, LoadError};
use crate::metrics::PerformanceMetrics;
use crate::split::SplitError;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("split error: {0}")]
    Split(#[from] SplitError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// What trading costs did to the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_commission: f64,
    pub total_slippage: f64,
    /// Total commission as a fraction of initial capital.
    pub commission_impact: f64,
    /// Total slippage cost as a fraction of initial capital.
    pub slippage_impact: f64,
}

impl CostSummary {
    pub fn from_run(run: &RunResult) -> Self {
        let impact = |v: f64| {
            if run.initial_capital > 0.0 {
                v / run.initial_capital
            } else {
                0.0
            }
        };
        Self {
            total_commission: run.total_commission,
            total_slippage: run.total_slippage,
            commission_impact: impact(run.total_commission),
            slippage_impact: impact(run.total_slippage),
        }
    }
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub label: String,
    pub config: BacktestConfig,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub metrics: PerformanceMetrics,
    pub costs: CostSummary,
    /// None when the benchmark is disabled in config.
    pub benchmark: Option<BenchmarkResult>,
    pub run: RunResult,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn initial_capital(&self) -> f64 {
        self.run.initial_capital
    }

    pub fn final_value(&self) -> f64 {
        self.run.final_value
    }

    /// Executed buys.
    pub fn num_trades(&self) -> usize {
        self.run.num_trades
    }

    pub fn closed_trade_count(&self) -> usize {
        self.run.closed_trade_count()
    }

    /// Strategy total return minus benchmark total return (mark-to-market).
    pub fn excess_return(&self) -> Option<f64> {
        self.benchmark
            .as_ref()
            .map(|b| self.metrics.total_return - b.metrics.total_return)
    }
}

/// Run one backtest on a pre-loaded series, logging through `tracing`.
pub fn run_single_backtest(
    series: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, RunError> {
    let logger = Arc::new(TracingLogger::new(config.label()));
    run_with_logger(series, config, logger)
}

/// Load `path`, then run.
pub fn run_from_csv(path: &Path, config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    let series = load_csv(path)?;
    run_single_backtest(&series, config)
}

/// Run one backtest with an explicit logger. No I/O.
pub fn run_with_logger(
    series: &PriceSeries,
    config: &BacktestConfig,
    logger: Arc<dyn RunLogger>,
) -> Result<BacktestResult, RunError> {
    let engine_config = config.to_engine_config()?;
    let engine = BacktestEngine::new(engine_config.clone(), Arc::clone(&logger))
        .map_err(EngineError::from)?;
    let mut run = engine.run(series)?;

    // Tag trades with where they came from; consumers may attach more keys.
    let source = serde_json::Value::String(run.signal_source.clone());
    for trade in &mut run.closed_trades {
        trade.annotate("signal_source", source.clone());
    }

    let benchmark = if config.benchmark.enabled {
        Some(run_buy_and_hold(series, &engine_config, logger)?)
    } else {
        None
    };

    let metrics = PerformanceMetrics::compute(&run.equity_curve, &run.closed_trades, run.initial_capital);

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        label: config.label().to_string(),
        config: config.clone(),
        start_date: series.start(),
        end_date: series.end(),
        metrics,
        costs: CostSummary::from_run(&run),
        benchmark,
        run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocklab_core::domain::Bar;
    use stocklab_core::logging::NullLogger;

    fn series() -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let closes = [100.0, 101.0, 104.0, 103.0, 108.0, 110.0];
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Bar::flat(start + chrono::Duration::days(i as i64), c).with_signals(i == 1, i == 4)
            })
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    #[test]
    fn result_carries_metrics_costs_and_benchmark() {
        let config = BacktestConfig::default();
        let result = run_with_logger(&series(), &config, Arc::new(NullLogger)).unwrap();

        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.run_id, config.run_id());
        assert_eq!(result.num_trades(), 1);
        assert_eq!(result.closed_trade_count(), 1);
        assert_eq!(result.metrics.win_rate, 1.0);
        assert_eq!(result.metrics.profit_factor, f64::INFINITY);
        assert!(result.costs.total_commission > 40.0);
        assert!(result.costs.commission_impact > 0.0);
        assert!(result.benchmark.is_some());
        assert!(result.excess_return().is_some());
        assert_eq!(
            result.run.closed_trades[0].extensions.get("signal_source"),
            Some(&serde_json::Value::String("series_columns".into()))
        );
    }

    #[test]
    fn benchmark_can_be_disabled() {
        let mut config = BacktestConfig::default();
        config.benchmark.enabled = false;
        let result = run_with_logger(&series(), &config, Arc::new(NullLogger)).unwrap();
        assert!(result.benchmark.is_none());
        assert!(result.excess_return().is_none());
    }

    #[test]
    fn invalid_config_fails_before_running() {
        let mut config = BacktestConfig::default();
        config.backtest.initial_capital = 0.0;
        let err = run_with_logger(&series(), &config, Arc::new(NullLogger)).unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::Invalid(_))));
    }
}
