//! StockLab Runner: backtest orchestration, metrics, benchmark, sweeps, export.
//!
//! This crate builds on `stocklab-core` to provide:
//! - CSV loading of signal-annotated price data
//! - TOML configuration with deterministic run ids
//! - Single-backtest runner with performance metrics and cost summary
//! - Buy & hold benchmark
//! - In-sample / out-of-sample split runs
//! - Parallel parameter sweeps ranked by a chosen metric
//! - JSON / CSV artifact export

pub mod benchmark;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod ranking;
pub mod runner;
pub mod split;
pub mod sweep;

pub use benchmark::{run_buy_and_hold, BenchmarkResult};
pub use config::{BacktestConfig, ConfigError, RunId};
pub use data_loader::{load_csv, read_series, LoadError};
pub use export::{export_json, import_json, load_artifacts, save_artifacts};
pub use metrics::PerformanceMetrics;
pub use ranking::RankingMetric;
pub use runner::{
    run_from_csv, run_single_backtest, run_with_logger, BacktestResult, CostSummary, RunError,
};
pub use split::{run_split, split_series, PeriodReport, SplitError, SplitPoint};
pub use sweep::{ParamGrid, ParamSweep, SweepResults};
